//! users entity
//! Accounts that create, join and sign contracts

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub identifier: String,  // External UUID, used as JWT subject
    pub user_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,  // Produced by the auth provider, never inspected here
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contracts::Entity")]
    CreatedContracts,
    #[sea_orm(has_many = "super::contract_parties::Entity")]
    Parties,
    #[sea_orm(has_many = "super::signatures::Entity")]
    Signatures,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedContracts.def()
    }
}

impl Related<super::contract_parties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl Related<super::signatures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signatures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
