use crate::application_port::*;
use crate::domain_model::{UserId, UserSummary};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub enum FakeVerifyOutcome {
    Authenticated(UserSummary),
    Anonymous,
    TransportError,
    /// Claims authentication without returning a user.
    Malformed,
}

#[derive(Debug)]
pub struct FakeAuthApi {
    verify_outcome: Mutex<FakeVerifyOutcome>,
    verify_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl FakeAuthApi {
    pub fn new() -> Self {
        Self::with_verify(FakeVerifyOutcome::Anonymous)
    }

    pub fn with_verify(outcome: FakeVerifyOutcome) -> Self {
        Self {
            verify_outcome: Mutex::new(outcome),
            verify_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_verify(&self, outcome: FakeVerifyOutcome) {
        if let Ok(mut lock) = self.verify_outcome.lock() {
            *lock = outcome;
        }
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal fake implementation for basic use only.
// The password "wrong" is the only credential it rejects.
#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .verify_outcome
            .lock()
            .map(|lock| lock.clone())
            .unwrap_or(FakeVerifyOutcome::TransportError);
        match outcome {
            FakeVerifyOutcome::Authenticated(user) => Ok(VerifyResponse {
                is_authenticated: true,
                user: Some(user),
            }),
            FakeVerifyOutcome::Anonymous => Ok(VerifyResponse {
                is_authenticated: false,
                user: None,
            }),
            FakeVerifyOutcome::TransportError => {
                Err(ApiError::Transport("connection refused".to_owned()))
            }
            FakeVerifyOutcome::Malformed => Ok(VerifyResponse {
                is_authenticated: true,
                user: None,
            }),
        }
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, ApiError> {
        if request.password == "wrong" {
            return Err(ApiError::Unauthorized("invalid credentials".to_owned()));
        }
        Ok(LoginResult {
            access_token: format!("fake-access-token:{}", request.username),
            user: fake_user(&request.username),
            message: "User logged in successfully".to_owned(),
        })
    }

    async fn register(&self, _request: RegisterInput) -> Result<String, ApiError> {
        Ok("User signed up successfully".to_owned())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fake_user(username: &str) -> UserSummary {
    UserSummary {
        id: get_fake_id(username),
        username: username.to_owned(),
        email: None,
    }
}

// FNV-1a, stable across runs
fn get_fake_id(username: &str) -> UserId {
    let hash = username
        .bytes()
        .fold(0xcbf29ce484222325u64, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x100000001b3)
        });
    UserId(hash)
}
