//! Admission check for protected screens.
//!
//! The guard is a pure read over the token store: it performs no network
//! call and cannot itself invalidate a session. A token that the server
//! has already rejected is caught lazily by the API client's 401 handling
//! on the next request, which clears the store and makes the guard deny
//! admission on the following check.

use tracing::debug;

use crate::app::Screen;

use super::TokenStore;

pub struct SessionGuard {
    store: TokenStore,
}

impl SessionGuard {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    /// True when the store currently holds an access token.
    pub fn is_admitted(&self) -> bool {
        self.store.get().is_authenticated()
    }

    /// Resolve a navigation request: protected screens fall back to the
    /// login screen when the user is not admitted.
    pub fn resolve(&self, requested: Screen) -> Screen {
        if requested.requires_auth() && !self.is_admitted() {
            debug!(?requested, "Unauthenticated navigation redirected to login");
            Screen::Login
        } else {
            requested
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_with_token(token: Option<&str>) -> SessionGuard {
        let store = TokenStore::in_memory();
        if let Some(t) = token {
            store.set(t.to_string(), None).unwrap();
        }
        SessionGuard::new(store)
    }

    #[test]
    fn test_admitted_iff_access_token_present() {
        assert!(!guard_with_token(None).is_admitted());
        assert!(guard_with_token(Some("token")).is_admitted());
    }

    #[test]
    fn test_is_admitted_idempotent() {
        let guard = guard_with_token(Some("token"));
        // Repeated checks without intervening store mutations agree
        for _ in 0..5 {
            assert!(guard.is_admitted());
        }
    }

    #[test]
    fn test_admission_follows_store_mutations() {
        let store = TokenStore::in_memory();
        let guard = SessionGuard::new(store.clone());

        assert!(!guard.is_admitted());
        store.set("token".into(), None).unwrap();
        assert!(guard.is_admitted());
        store.clear().unwrap();
        assert!(!guard.is_admitted());
    }

    #[test]
    fn test_unauthenticated_protected_navigation_redirects_to_login() {
        let guard = guard_with_token(None);
        assert_eq!(guard.resolve(Screen::Dashboard), Screen::Login);
        assert_eq!(guard.resolve(Screen::TwoFactorSetup), Screen::Login);
        // Public screens are always reachable
        assert_eq!(guard.resolve(Screen::Login), Screen::Login);
        assert_eq!(guard.resolve(Screen::Register), Screen::Register);
    }

    #[test]
    fn test_admitted_navigation_passes_through() {
        let guard = guard_with_token(Some("token"));
        assert_eq!(guard.resolve(Screen::Dashboard), Screen::Dashboard);
        assert_eq!(guard.resolve(Screen::TwoFactorSetup), Screen::TwoFactorSetup);
    }
}
