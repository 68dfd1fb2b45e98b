//! Outgoing email templates.

use crate::domain::types::{AUTHCODE_TTL_MINUTES, EmailMessage};

/// Login code email: subject, HTML and plain-text bodies.
pub fn auth_code_email(to: &str, code: &str) -> EmailMessage {
    let subject = format!("Seu código de acesso FinanceHUB: {code}");
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
  <body style="font-family: Arial, sans-serif; color: #1f2937;">
    <h2>Código de acesso</h2>
    <p>Use o código abaixo para entrar no FinanceHUB:</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{code}</p>
    <p>O código é válido por {AUTHCODE_TTL_MINUTES} minutos e pode ser usado apenas uma vez.</p>
    <p>Se você não solicitou este código, ignore este email.</p>
  </body>
</html>"#
    );
    let text = format!(
        "Seu código de acesso FinanceHUB: {code}\n\n\
         O código é válido por {AUTHCODE_TTL_MINUTES} minutos e pode ser usado apenas uma vez.\n\
         Se você não solicitou este código, ignore este email.\n"
    );
    EmailMessage {
        to: to.to_owned(),
        subject,
        html,
        text,
    }
}
