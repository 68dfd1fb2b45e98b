use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, Select,
    sea_query::{Expr, Func},
};

/// Case-insensitive equality filter: `LOWER(column) = LOWER(value)`.
pub trait FilterLowerEq {
    fn filter_lower_eq<C>(self, column: C, value: &str) -> Self
    where
        C: ColumnTrait;
}

impl<E> FilterLowerEq for Select<E>
where
    E: EntityTrait,
{
    fn filter_lower_eq<C>(self, column: C, value: &str) -> Self
    where
        C: ColumnTrait,
    {
        self.filter(
            Expr::expr(Func::lower(Expr::col(column))).eq(value.to_lowercase()),
        )
    }
}
