use reqwest::Url;

use crate::{Client, ClientBuilder};

#[macro_export]
/// Creates a mock web server, which responds with a predefined status when
/// handling any incoming request
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::any()).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Build a client whose relative request URLs resolve against the given
/// mock server.
///
/// # Panic
///
/// This panics on error, so it should only be used for testing
pub(crate) fn mock_client(uri: &str) -> Client {
    ClientBuilder::builder()
        .base_url(Url::parse(uri).expect("Expected valid mock server URI"))
        .build()
        .client()
        .expect("Expected valid client")
}
