// Course materials. Files go straight from the client to object storage
// through presigned URLs; the API only records metadata.

pub mod handlers;
pub mod storage;
