use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a task. Stored and serialized by its Portuguese name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TaskStatus {
    #[sea_orm(string_value = "Pendente")]
    #[serde(rename = "Pendente")]
    Pending,
    #[sea_orm(string_value = "EmAndamento")]
    #[serde(rename = "EmAndamento")]
    InProgress,
    #[sea_orm(string_value = "Finalizado")]
    #[serde(rename = "Finalizado")]
    Done,
}

impl TaskStatus {
    /// Returns the name used on the wire and in the database.
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pendente",
            TaskStatus::InProgress => "EmAndamento",
            TaskStatus::Done => "Finalizado",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn can_serialize_status_by_portuguese_name() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"EmAndamento\"");
    }

    #[test]
    fn can_match_stored_value_with_wire_name() {
        for status in TaskStatus::iter() {
            assert_eq!(status.to_value(), status.name());
        }
    }
}
