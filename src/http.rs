use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;

use crate::config::{ GeneratorConfig, USER_AGENT };
use crate::error::NoticeError;

/// Status and `Location` of a single HEAD request, without following it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    pub location: Option<String>,
}

impl HeadResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Plain HTTP operations used by URL canonicalization and license download.
pub trait HttpProbe: Sync {
    fn head(&self, url: &str) -> Result<HeadResponse, NoticeError>;
    fn get_body(&self, url: &str) -> Result<String, NoticeError>;
}

/// Shared client setup: explicit timeout and a user agent GitHub accepts.
pub fn client_builder(config: &GeneratorConfig) -> reqwest::blocking::ClientBuilder {
    Client::builder().timeout(config.timeout).user_agent(USER_AGENT)
}

pub struct ReqwestHttp {
    probe: Client,
    client: Client,
}

impl ReqwestHttp {
    pub fn new(config: &GeneratorConfig) -> Result<Self, NoticeError> {
        let probe = client_builder(config)
            .redirect(Policy::none())
            .build()
            .map_err(|e| NoticeError::http("<client>", e))?;
        let client = client_builder(config)
            .build()
            .map_err(|e| NoticeError::http("<client>", e))?;
        Ok(ReqwestHttp { probe, client })
    }
}

impl HttpProbe for ReqwestHttp {
    fn head(&self, url: &str) -> Result<HeadResponse, NoticeError> {
        let response = self.probe
            .head(url)
            .send()
            .map_err(|e| NoticeError::http(url, e))?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        Ok(HeadResponse {
            status: response.status().as_u16(),
            location,
        })
    }

    fn get_body(&self, url: &str) -> Result<String, NoticeError> {
        let response = self.client
            .get(url)
            .send()
            .map_err(|e| NoticeError::http(url, e))?;

        if !response.status().is_success() {
            return Err(NoticeError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().map_err(|e| NoticeError::http(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    fn http() -> ReqwestHttp {
        ReqwestHttp::new(&GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_head_does_not_follow_redirects() {
        let server = MockServer::start();
        let redirect = server.mock(|when, then| {
            when.method(HEAD).path("/old");
            then.status(302).header("Location", "https://example.org/new");
        });

        let response = http().head(&server.url("/old")).unwrap();
        redirect.assert();
        assert!(response.is_redirect());
        assert_eq!(response.location.as_deref(), Some("https://example.org/new"));
    }

    #[test]
    fn test_head_plain_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/here");
            then.status(200);
        });

        let response = http().head(&server.url("/here")).unwrap();
        assert_eq!(response, HeadResponse { status: 200, location: None });
    }

    #[test]
    fn test_get_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/LICENSE");
            then.status(200).body("MIT License\n");
        });
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let http = http();
        assert_eq!(http.get_body(&server.url("/LICENSE")).unwrap(), "MIT License\n");
        assert!(
            matches!(http.get_body(&server.url("/missing")), Err(NoticeError::Status { status: 404, .. }))
        );
    }
}
