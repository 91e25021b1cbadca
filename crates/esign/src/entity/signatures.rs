//! signatures entity
//! Append-only ledger, unique per (version_id, signer_id)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "signatures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub version_id: i64,
    pub signer_id: i64,
    pub signature_hash: String,  // Hex SHA256(identifier || file_hash || signed_at)
    pub signed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract_versions::Entity",
        from = "Column::VersionId",
        to = "super::contract_versions::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Version,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SignerId",
        to = "super::users::Column::Id"
    )]
    Signer,
}

impl Related<super::contract_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Version.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
