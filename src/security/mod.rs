mod api_key;

pub use api_key::{ApiKeyLayer, ApiKeyRecord, ApiKeyService, ApiKeyStore, AuthenticatedUser, API_KEY_HEADER};
