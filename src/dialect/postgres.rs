use crate::condition::Field;
use crate::error::SqlbindResult;
use crate::params::QueryParams;
use crate::value::Value;

use super::Renderer;

/// PostgreSQL: membership as `field = ANY(<array param>)`.
///
/// The whole list is bound as one array parameter, so the marker count does
/// not grow with the list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRenderer;

impl Renderer for PostgresRenderer {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn membership(
        &self,
        field: &Field,
        values: &[Value],
        params: &mut QueryParams,
    ) -> SqlbindResult<String> {
        let f = self.field(field);
        Ok(format!(
            "{} = ANY({})",
            f,
            params.compile(Value::Array(values.to_vec()))
        ))
    }
}
