use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::auth::{
    dto::{AuthResponse, LoginUserRequest, RegisterUserRequest},
    jwt::JwtKeys,
    password::Hasher,
    repo::{CredentialStore, StoreError},
    repo_types::{NewUser, PublicUser},
};
use crate::error::AuthError;

/// Registration and login over a credential store. Holds no per-request state.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Hasher,
    keys: JwtKeys,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::DuplicateUser,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: Hasher, keys: JwtKeys) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    /// Expects a request that already passed [`RegisterUserRequest::validate`].
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterUserRequest) -> Result<AuthResponse, AuthError> {
        if self.store.find_by_email(&req.email).await?.is_some() {
            warn!("email already registered");
            return Err(AuthError::DuplicateUser);
        }

        let hash = self.hash_password(req.password).await?;

        // the unique index is authoritative; a concurrent registration lands here
        let user = self
            .store
            .create(NewUser::new(req.email, req.name, hash))
            .await
            .map_err(|e| {
                if matches!(e, StoreError::Duplicate) {
                    warn!("email registered concurrently");
                }
                AuthError::from(e)
            })?
            .into_public();

        let token = self.sign(&user)?;
        info!(user_id = %user.id, "user registered");
        Ok(AuthResponse { user, token })
    }

    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginUserRequest) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.store.find_by_email(&req.email).await? else {
            warn!("login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(req.password, user.password_hash.clone())
            .await?
        {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = user.into_public();
        let token = self.sign(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse { user, token })
    }

    async fn hash_password(&self, plain: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
            .map_err(|e| AuthError::HashingFailure(e.to_string()))
    }

    async fn verify_password(&self, plain: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))
    }

    fn sign(&self, user: &PublicUser) -> Result<String, AuthError> {
        self.keys.issue(user).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AuthError::SigningFailure(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_keys;
    use crate::auth::password::test_hasher;
    use crate::auth::repo::testing::{
        DownCredentialStore, MemoryCredentialStore, RacingCredentialStore,
    };
    use crate::auth::repo_types::User;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn service(store: Arc<dyn CredentialStore>) -> AuthService {
        AuthService::new(store, test_hasher(), test_keys())
    }

    fn ann_register() -> RegisterUserRequest {
        RegisterUserRequest {
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password: "Abcdef1!".into(),
        }
    }

    fn login(email: &str, password: &str) -> LoginUserRequest {
        LoginUserRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_token() {
        let store = Arc::new(MemoryCredentialStore::default());
        let svc = service(store.clone());

        let res = svc.register(ann_register()).await.expect("register");
        assert_eq!(res.user.email, "ann@x.com");
        assert_eq!(res.user.name, "Ann");
        assert_eq!(store.len(), 1);

        let stored = store.find_by_email("ann@x.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "Abcdef1!");
        assert!(test_hasher().verify("Abcdef1!", &stored.password_hash));

        let claims = test_keys().verify(&res.token).expect("token verifies");
        assert_eq!(claims.sub, res.user.id);
        assert_eq!(claims.email, res.user.email);
        assert_eq!(claims.name, res.user.name);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_without_write() {
        let store = Arc::new(MemoryCredentialStore::default());
        let svc = service(store.clone());

        svc.register(ann_register()).await.expect("first register");
        let err = svc.register(ann_register()).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser));
        assert_eq!(err.to_string(), "User already exists");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unique_constraint_catches_racing_registration() {
        let store = Arc::new(RacingCredentialStore::default());
        let svc = service(store.clone());

        svc.register(ann_register()).await.expect("first register");
        let err = svc.register(ann_register()).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser));
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_password() {
        let svc = service(Arc::new(MemoryCredentialStore::default()));
        let registered = svc.register(ann_register()).await.unwrap();

        let res = svc.login(login("ann@x.com", "Abcdef1!")).await.expect("login");
        assert_eq!(res.user, registered.user);
        let claims = test_keys().verify(&res.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
    }

    #[tokio::test]
    async fn credential_failures_are_indistinguishable() {
        let svc = service(Arc::new(MemoryCredentialStore::default()));
        svc.register(ann_register()).await.unwrap();

        let wrong_pw = svc.login(login("ann@x.com", "wrong")).await.unwrap_err();
        let no_user = svc.login(login("bob@x.com", "Abcdef1!")).await.unwrap_err();

        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(no_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
        assert_eq!(wrong_pw.to_string(), "User/Password not valid");
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_invalid_credentials() {
        let store = Arc::new(MemoryCredentialStore::default());
        store.seed(User {
            id: Uuid::new_v4(),
            email: "legacy@x.com".into(),
            name: "Legacy".into(),
            password_hash: "$2b$10$not-an-argon2-hash".into(),
            created_at: OffsetDateTime::now_utc(),
        });
        let svc = service(store);

        let err = svc.login(login("legacy@x.com", "Abcdef1!")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn store_outage_is_infrastructure_failure() {
        let svc = service(Arc::new(DownCredentialStore));

        let err = svc.register(ann_register()).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        assert!(err.is_infrastructure());

        let err = svc.login(login("ann@x.com", "Abcdef1!")).await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn unsignable_expiry_is_signing_failure() {
        let keys = crate::auth::jwt::make_keys("test-secret", "iss", "aud", 1_000_000_000_000);
        let svc = AuthService::new(
            Arc::new(MemoryCredentialStore::default()),
            test_hasher(),
            keys,
        );

        let err = svc.register(ann_register()).await.unwrap_err();
        assert!(matches!(err, AuthError::SigningFailure(_)));
        assert!(err.is_infrastructure());
    }
}
