// Parents: legacy phone-column metadata, lookups used by notifications,
// and the parent routes.

pub mod handlers;
pub mod metadata;
pub mod phone;
pub mod repo;
