#![allow(dead_code)]

use chat_relay::AppState;
use chat_relay::config::{AppConfig, AppIdentity, ChatConfig, ProviderConfig, ServerConfig};
use std::sync::Arc;

pub const API_KEY: &str = "test-key";
pub const MODEL: &str = "test-model";

/// Frames a provider would send for the reply "Hello".
pub const HELLO_STREAM: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
    "data: [DONE]\n\n",
);

pub fn test_config(api_url: Option<String>) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        provider: ProviderConfig {
            api_url,
            api_key: Some(API_KEY.to_string()),
            model: Some(MODEL.to_string()),
            max_tokens: 1000,
        },
        app: AppIdentity {
            url: "http://localhost:3000".to_string(),
            title: "test-relay".to_string(),
        },
        chat: ChatConfig {
            system_prompt: "Be brief.".to_string(),
            temperature: 0.7,
        },
    }
}

pub fn test_state(config: AppConfig) -> AppState {
    AppState::new(Arc::new(config))
}
