use sea_orm::entity::prelude::*;

/// User profile. `id` doubles as the identity-provider subject id for accounts
/// provisioned through profile sync.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub nome: String,
    /// Stored normalized (trimmed, lowercase).
    #[sea_orm(unique)]
    pub email: String,
    /// One of `admin`, `gerente`, `usuario`.
    pub role: String,
    pub ativo: bool,
    /// Owning manager for sub-accounts; `None` means the user owns itself.
    pub gerente_id: Option<Uuid>,
    pub ultimo_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
