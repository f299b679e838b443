use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tracing::warn;

use crate::config::{ConfigError, CorsConfig};

/// Build the CORS layer applied to every route.
///
/// Entries that do not parse as a header value, method or header name are
/// skipped with a warning. With credentials enabled, `*` in the method or
/// header list mirrors the preflight request instead of answering `*`, which
/// browsers ignore on credentialed requests.
///
/// # Errors
/// Returns [`ConfigError::WildcardOriginWithCredentials`] for `allowed_origins=['*']`
/// combined with `allow_credentials=true`.
pub fn build_cors_layer(cfg: &CorsConfig) -> Result<CorsLayer, ConfigError> {
    let wildcard_origin = cfg.has_wildcard_origin();
    if wildcard_origin && cfg.allow_credentials {
        return Err(ConfigError::WildcardOriginWithCredentials);
    }

    let mut layer = CorsLayer::new();

    if wildcard_origin {
        warn!(
            "CORS allows any origin; list explicit origins for deployments \
             that should only be reachable from known front ends"
        );
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = parse_all(&cfg.allowed_origins, "origin", |s| {
            HeaderValue::from_str(s).ok()
        });
        if !origins.is_empty() {
            layer = layer.allow_origin(origins);
        }
    }

    if is_wildcard(&cfg.allowed_methods) {
        layer = if cfg.allow_credentials {
            layer.allow_methods(AllowMethods::mirror_request())
        } else {
            layer.allow_methods(Any)
        };
    } else {
        let methods: Vec<Method> =
            parse_all(&cfg.allowed_methods, "method", |s| s.parse().ok());
        if !methods.is_empty() {
            layer = layer.allow_methods(methods);
        }
    }

    if is_wildcard(&cfg.allowed_headers) {
        layer = if cfg.allow_credentials {
            layer.allow_headers(AllowHeaders::mirror_request())
        } else {
            layer.allow_headers(Any)
        };
    } else {
        let headers: Vec<HeaderName> =
            parse_all(&cfg.allowed_headers, "header", |s| s.parse().ok());
        if !headers.is_empty() {
            layer = layer.allow_headers(headers);
        }
    }

    if cfg.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if cfg.max_age_seconds > 0 {
        layer = layer.max_age(Duration::from_secs(cfg.max_age_seconds));
    }

    Ok(layer)
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

fn parse_all<T>(values: &[String], what: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    values
        .iter()
        .filter_map(|raw| {
            let parsed = parse(raw);
            if parsed.is_none() {
                warn!(value = %raw, "ignoring invalid CORS {what}");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        assert!(build_cors_layer(&CorsConfig::default()).is_ok());
    }

    #[test]
    fn wildcard_with_credentials_is_rejected() {
        let cfg = CorsConfig {
            allow_credentials: true,
            ..CorsConfig::default()
        };
        assert_eq!(
            build_cors_layer(&cfg).err(),
            Some(ConfigError::WildcardOriginWithCredentials)
        );
    }

    #[test]
    fn explicit_lists_build_with_credentials() {
        let cfg = CorsConfig {
            allowed_origins: vec!["https://sac.example.com".to_owned()],
            allowed_methods: vec!["GET".to_owned(), "POST".to_owned(), "OPTIONS".to_owned()],
            allowed_headers: vec!["authorization".to_owned(), "content-type".to_owned()],
            allow_credentials: true,
            max_age_seconds: 600,
        };
        assert!(build_cors_layer(&cfg).is_ok());
    }

    #[test]
    fn wildcard_methods_and_headers_mirror_with_credentials() {
        let cfg = CorsConfig {
            allowed_origins: vec!["https://sac.example.com".to_owned()],
            allow_credentials: true,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cfg).is_ok());
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let parsed: Vec<Method> = parse_all(
            &["GET".to_owned(), "NOT A METHOD".to_owned()],
            "method",
            |s| s.parse().ok(),
        );
        assert_eq!(parsed, vec![Method::GET]);
    }
}
