use std::sync::Mutex;

use furnimart_core::{Navigator, Route};
use tracing::debug;

/// Remembers the last navigation the session asked for, so the CLI can tell
/// the user where to go once the command finishes.
#[derive(Default)]
pub struct TerminalNavigator {
    last: Mutex<Option<Route>>,
}

impl TerminalNavigator {
    pub fn report(&self) {
        let last = match self.last.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(route) = last {
            if let Some(hint) = login_hint(&route) {
                eprintln!("{}", hint);
            }
        }
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        debug!(path = route.path(), "Navigate");
        match self.last.lock() {
            Ok(mut guard) => *guard = Some(route),
            Err(poisoned) => *poisoned.into_inner() = Some(route),
        }
    }
}

fn login_hint(route: &Route) -> Option<String> {
    match route {
        Route::Home => None,
        Route::Login { return_to: None } => {
            Some("Your session has ended. Run `furnimart login` to sign in again.".to_string())
        }
        Route::Login {
            return_to: Some(destination),
        } => Some(format!(
            "Sign in to continue to {}: run `furnimart login`, then repeat the command.",
            destination
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_hint_mentions_destination() {
        assert_eq!(login_hint(&Route::Home), None);
        let hint = login_hint(&Route::Login {
            return_to: Some("/mypage".into()),
        })
        .unwrap();
        assert!(hint.contains("/mypage"));
    }

    #[test]
    fn test_last_navigation_wins() {
        let nav = TerminalNavigator::default();
        nav.navigate(Route::Login { return_to: None });
        nav.navigate(Route::Login {
            return_to: Some("/sell".into()),
        });
        assert_eq!(
            *nav.last.lock().unwrap(),
            Some(Route::Login {
                return_to: Some("/sell".into())
            })
        );
    }
}
