//! Origin and client admission.
//!
//! Decides, before any authentication, whether a request may reach the
//! service at all, and which CORS headers an admitted response carries.
//!
//! # Policy
//!
//! 1. Public deployments admit everything with a wildcard origin and
//!    credential sharing disabled.
//! 2. Otherwise a request is admitted when its origin is allow-listed, its
//!    user agent is a first-party mobile runtime (Expo Go on Android or iOS),
//!    or its user agent is the API testing tool and that tool is enabled.
//! 3. Everything else is denied.
//!
//! # Invariants
//!
//! - The decision is a pure function of configuration and request metadata.
//! - A wildcard origin is never combined with `Allow-Credentials: true`.

use std::collections::HashSet;
use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderValue, header};
use regex::Regex;

/// Methods advertised to admitted callers.
pub const ALLOW_METHODS: &str = "GET, OPTIONS, POST, PUT, DELETE";

/// Request headers advertised to admitted callers.
pub const ALLOW_HEADERS: &str = "X-Requested-With, Content-Type, Authorization, Cookie, Set-Cookie";

/// Expo Go on Android identifies itself through its HTTP stack.
const EXPO_ANDROID_MARKER: &str = "okhttp";

/// User-agent marker of the API testing tool.
const TESTING_TOOL_MARKER: &str = "Postman";

static EXPO_IOS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Constant pattern.
    Regex::new(r"Expo/\d+ CFNetwork/\d+\.\d+\.\d+ Darwin/\d+\.\d+\.\d+")
        .expect("valid Expo iOS user-agent pattern")
});

/// Who sent a request, judged from its user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSignature {
    ExpoAndroid,
    ExpoIos,
    TestingTool,
    Unrecognized,
}

impl ClientSignature {
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains(EXPO_ANDROID_MARKER) {
            Self::ExpoAndroid
        } else if EXPO_IOS_PATTERN.is_match(user_agent) {
            Self::ExpoIos
        } else if user_agent.contains(TESTING_TOOL_MARKER) {
            Self::TestingTool
        } else {
            Self::Unrecognized
        }
    }

    #[must_use]
    pub const fn is_mobile_app(self) -> bool {
        matches!(self, Self::ExpoAndroid | Self::ExpoIos)
    }
}

/// CORS headers attached to an admitted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    /// `*` in public mode, otherwise the request's own origin (may be empty
    /// for native clients, in which case no origin header is sent).
    pub allow_origin: String,
    pub allow_credentials: bool,
}

impl CorsHeaders {
    /// Write the headers into a response header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if !self.allow_origin.is_empty() {
            if let Ok(origin) = HeaderValue::from_str(&self.allow_origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static(if self.allow_credentials { "true" } else { "false" }),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
    }
}

/// Outcome of the admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allow(CorsHeaders),
    Deny,
}

/// Gate configuration, fixed at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateConfig {
    pub allowed_origins: Vec<String>,
    pub public_api: bool,
    pub testing_tool_allowed: bool,
}

/// The admission gate.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed_origins: HashSet<String>,
    public_api: bool,
    testing_tool_allowed: bool,
}

impl OriginGate {
    #[must_use]
    pub fn new(config: &GateConfig) -> Self {
        Self {
            allowed_origins: config
                .allowed_origins
                .iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            public_api: config.public_api,
            testing_tool_allowed: config.testing_tool_allowed,
        }
    }

    /// Decide whether a request with this origin and user agent is admitted.
    #[must_use]
    pub fn decide(&self, origin: &str, user_agent: &str) -> Admission {
        if self.public_api {
            return Admission::Allow(CorsHeaders {
                allow_origin: "*".to_string(),
                allow_credentials: false,
            });
        }

        let signature = ClientSignature::from_user_agent(user_agent);
        let admitted = (!origin.is_empty() && self.allowed_origins.contains(origin))
            || signature.is_mobile_app()
            || (self.testing_tool_allowed && signature == ClientSignature::TestingTool);

        if admitted {
            Admission::Allow(CorsHeaders {
                allow_origin: origin.to_string(),
                allow_credentials: true,
            })
        } else {
            Admission::Deny
        }
    }
}
