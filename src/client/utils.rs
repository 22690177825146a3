use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use crate::client::config::LiveConfig;
use crate::client::consts::API_KEY_HEADER;

pub fn build_request(config: &LiveConfig) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request = config.base_url().into_client_request()?;
    request
        .headers_mut()
        .insert(API_KEY_HEADER, config.api_key().expose_secret().parse()?);
    Ok(request)
}
