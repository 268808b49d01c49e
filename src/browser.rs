//! Narrow WebDriver seam used by the exchange adapters

use std::time::Duration;

use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::config::Config;
use crate::error::FetchError;

// WebDriver key code for Enter
const ENTER_KEY: &str = "\u{E007}";

/// The only browser operations the adapters get to use. Keeping the seam
/// this narrow keeps the site-specific extraction fixture-testable.
#[async_trait::async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    async fn current_url(&mut self) -> Result<String, FetchError>;

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError>;

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), FetchError>;

    async fn press_enter(&mut self, selector: &str) -> Result<(), FetchError>;

    async fn page_source(&mut self) -> Result<String, FetchError>;

    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}

/// Launches one browser session per adapter call; sessions are never held
/// across batch entries.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

pub struct WebDriverFactory {
    webdriver_url: String,
    user_agent: String,
    navigation_timeout: Duration,
}

impl WebDriverFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.http.user_agent.clone(),
            navigation_timeout: config.navigation_timeout(),
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for WebDriverFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-gpu",
                    "--disable-blink-features=AutomationControlled",
                    format!("--user-agent={}", self.user_agent),
                ],
                "excludeSwitches": ["enable-automation"],
            }),
        );

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&self.webdriver_url)
            .await?;

        Ok(Box::new(WebDriverSession {
            client,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

struct WebDriverSession {
    client: Client,
    navigation_timeout: Duration,
}

#[async_trait::async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        match tokio::time::timeout(self.navigation_timeout, self.client.goto(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::NavigationTimeout(self.navigation_timeout)),
        }

        // Best-effort fingerprint mask; the exchange sites probe
        // navigator.webdriver before serving content.
        let _ = self
            .client
            .execute(
                "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });",
                vec![],
            )
            .await;

        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, FetchError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(FetchError::ElementTimeout {
                selector: selector.to_string(),
                timeout,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), FetchError> {
        let mut element = self.client.find(Locator::Css(selector)).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn press_enter(&mut self, selector: &str) -> Result<(), FetchError> {
        let mut element = self.client.find(Locator::Css(selector)).await?;
        element.send_keys(ENTER_KEY).await?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, FetchError> {
        Ok(self.client.source().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.client.close().await?;
        Ok(())
    }
}
