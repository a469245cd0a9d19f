//! Twitter OAuth endpoints and wire constants

/// OAuth2 token endpoint (client credentials grant)
pub const TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth2/token";

/// OAuth2 bearer token invalidation endpoint
pub const INVALIDATE_ENDPOINT: &str = "https://api.twitter.com/oauth2/invalidate_token";

/// Base URL for REST calls; endpoints are appended as `/<endpoint>.json`
pub const REST_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Base URL for streaming subscriptions
pub const STREAM_BASE_URL: &str = "https://stream.twitter.com/1.1";

/// Content type sent with both OAuth2 POSTs.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Body of the client credentials grant.
pub const CLIENT_CREDENTIALS_GRANT: &str = "grant_type=client_credentials";
