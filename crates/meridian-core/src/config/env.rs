use super::Config;
use crate::secret::Secret;

fn secret_from_env(key: &str) -> Option<Secret> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Secret::new)
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_index();
        self.apply_env_overrides_service();
    }

    pub(crate) fn resolve_secrets(&mut self) {
        self.secrets.openai_api_key = secret_from_env("MERIDIAN_OPENAI_API_KEY");
        self.secrets.openweather_api_key = secret_from_env("MERIDIAN_OPENWEATHER_API_KEY");
        self.secrets.gateway_token = secret_from_env("MERIDIAN_GATEWAY_TOKEN");
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("MERIDIAN_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid MERIDIAN_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("MERIDIAN_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("MERIDIAN_INDEX_ROOT") {
            self.index.root = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_INDEX_STORE") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.index.store = kind;
            } else {
                tracing::warn!("ignoring invalid MERIDIAN_INDEX_STORE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("MERIDIAN_QDRANT_URL") {
            self.index.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.chunk_size = n;
        }
        if let Ok(v) = std::env::var("MERIDIAN_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("MERIDIAN_INDEX_SUMMARIZE")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.index.summarize = enabled;
        }
        if let Ok(v) = std::env::var("MERIDIAN_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<u64>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("MERIDIAN_ROUTER_KEYWORD_SHORTCUT")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.router.keyword_shortcut = enabled;
        }
    }

    fn apply_env_overrides_service(&mut self) {
        if let Ok(v) = std::env::var("MERIDIAN_WEATHER_BASE_URL") {
            self.weather.base_url = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_WEATHER_UNITS") {
            if let Ok(units) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.weather.units = units;
            } else {
                tracing::warn!("ignoring invalid MERIDIAN_WEATHER_UNITS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("MERIDIAN_TIMEOUT_WEATHER")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.weather_seconds = secs;
        }
        if let Ok(v) = std::env::var("MERIDIAN_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("MERIDIAN_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("MERIDIAN_GATEWAY_RATE_LIMIT")
            && let Ok(rate) = v.parse::<u32>()
        {
            self.gateway.rate_limit = rate;
        }
        if let Ok(v) = std::env::var("MERIDIAN_GATEWAY_MAX_BODY_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.gateway.max_body_size = size;
        }
    }
}
