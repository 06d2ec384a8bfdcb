use crate::application_impl::recipe_status_payload;
use crate::domain_model::*;
use crate::logger::*;
use crate::stub_service::StubError;
use dashmap::DashMap;
use nanoid::nanoid;
use std::sync::atomic::{AtomicU64, Ordering};

struct StubUser {
    summary: UserSummary,
    password: String,
}

struct StubToken {
    username: String,
    revoked: bool,
}

struct StubJob {
    owner: String,
    prompt: String,
    reads: u32,
}

/// In-memory accounts, access tokens and generation jobs.
pub struct StubState {
    polls_until_complete: u32,
    next_user_id: AtomicU64,
    users: DashMap<String, StubUser>,
    tokens: DashMap<String, StubToken>,
    jobs: DashMap<JobId, StubJob>,
}

impl StubState {
    /// Jobs report complete on their `polls_until_complete`-th status read.
    pub fn new(polls_until_complete: u32) -> Self {
        Self {
            polls_until_complete: polls_until_complete.max(1),
            next_user_id: AtomicU64::new(1),
            users: DashMap::new(),
            tokens: DashMap::new(),
            jobs: DashMap::new(),
        }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<UserSummary, StubError> {
        if username.is_empty() || password.is_empty() {
            return Err(StubError::BadRequest("username and password are required".to_owned()));
        }
        validate_password(password).map_err(|e| StubError::BadRequest(e.to_string()))?;

        let summary = UserSummary {
            id: UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst)),
            username: username.to_owned(),
            email: (!email.is_empty()).then(|| email.to_owned()),
        };
        match self.users.entry(username.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StubError::UsernameTaken),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(StubUser {
                    summary: summary.clone(),
                    password: password.to_owned(),
                });
                info!(%username, "stub user registered");
                Ok(summary)
            }
        }
    }

    /// Returns a fresh access token.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, UserSummary), StubError> {
        let user = self
            .users
            .get(username)
            .filter(|user| user.password == password)
            .map(|user| user.summary.clone())
            .ok_or(StubError::InvalidCredentials)?;

        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.insert(
            token.clone(),
            StubToken {
                username: username.to_owned(),
                revoked: false,
            },
        );
        Ok((token, user))
    }

    pub fn authenticate(&self, token: &str) -> Result<UserSummary, StubError> {
        let username = match self.tokens.get(token) {
            Some(entry) if entry.revoked => return Err(StubError::Revoked),
            Some(entry) => entry.username.clone(),
            None => return Err(StubError::InvalidToken),
        };
        self.users
            .get(&username)
            .map(|user| user.summary.clone())
            .ok_or(StubError::InvalidToken)
    }

    pub fn logout(&self, token: &str) {
        self.tokens.remove(token);
    }

    /// Revokes every token of `username`. Requests carrying them are answered
    /// with the force-logout marker from then on.
    pub fn revoke(&self, username: &str) -> usize {
        let mut revoked = 0;
        for mut entry in self.tokens.iter_mut() {
            if entry.username == username && !entry.revoked {
                entry.revoked = true;
                revoked += 1;
            }
        }
        warn!(%username, revoked, "stub sessions revoked");
        revoked
    }

    pub fn create_job(&self, owner: &UserSummary, prompt: &str) -> Result<JobId, StubError> {
        if prompt.trim().is_empty() {
            return Err(StubError::BadRequest("userPrompt is required".to_owned()));
        }
        let job_id = JobId(nanoid!(12));
        self.jobs.insert(
            job_id.clone(),
            StubJob {
                owner: owner.username.clone(),
                prompt: prompt.to_owned(),
                reads: 0,
            },
        );
        debug!(%job_id, owner = %owner.username, "stub job created");
        Ok(job_id)
    }

    pub fn read_job(&self, reader: &UserSummary, job_id: &JobId) -> Result<serde_json::Value, StubError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .filter(|job| job.owner == reader.username)
            .ok_or(StubError::JobNotFound)?;
        job.reads += 1;
        Ok(recipe_status_payload(&job.prompt, job.reads >= self.polls_until_complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_tokens_are_reported_as_revoked() {
        let state = StubState::new(1);
        state.register("ana", "", "Secret1!").unwrap();
        let (token, user) = state.login("ana", "Secret1!").unwrap();
        assert_eq!(state.authenticate(&token).unwrap(), user);

        assert_eq!(state.revoke("ana"), 1);
        assert!(matches!(state.authenticate(&token), Err(StubError::Revoked)));
        assert!(matches!(state.authenticate("nope"), Err(StubError::InvalidToken)));
    }

    #[test]
    fn jobs_complete_after_configured_reads_and_stay_private() {
        let state = StubState::new(2);
        let ana = state.register("ana", "", "Secret1!").unwrap();
        let bob = state.register("bob", "", "Secret1!").unwrap();
        let job_id = state.create_job(&ana, "pancakes").unwrap();

        assert!(matches!(state.read_job(&bob, &job_id), Err(StubError::JobNotFound)));
        assert_eq!(state.read_job(&ana, &job_id).unwrap()["generationComplete"], false);
        assert_eq!(state.read_job(&ana, &job_id).unwrap()["generationComplete"], true);
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let state = StubState::new(1);
        state.register("ana", "", "Secret1!").unwrap();
        assert!(matches!(
            state.register("ana", "", "Secret1!"),
            Err(StubError::UsernameTaken)
        ));
        assert!(matches!(
            state.login("ana", "Secret2!"),
            Err(StubError::InvalidCredentials)
        ));
    }
}
