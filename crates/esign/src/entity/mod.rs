//! Sea-ORM entities for contract e-signature tables

pub mod users;
pub mod contracts;
pub mod contract_versions;
pub mod contract_parties;
pub mod signatures;

// Re-export entities for convenience
pub use users::Entity as Users;
pub use contracts::Entity as Contracts;
pub use contract_versions::Entity as ContractVersions;
pub use contract_parties::Entity as ContractParties;
pub use signatures::Entity as Signatures;

pub use contract_parties::PartyRole;
pub use contract_versions::VersionStatus;
pub use contracts::ContractStatus;
