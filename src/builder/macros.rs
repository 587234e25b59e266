//! Macros for ergonomic state map construction.

/// Build a [`StateConfig`](crate::config::StateConfig) from a nested map.
///
/// Each entry is `name => targets`, where targets are one of:
/// `none` or `()` (no transitions), `*` (every other leaf), a single
/// state name, a list `[a, b]`, or a nested `{ ... }` block declaring a
/// group.
///
/// # Example
///
/// ```
/// use stateful::states;
///
/// let config = states! {
///     draft => beta,
///     published => {
///         beta => {
///             needs_feedback => [draft, needs_approval],
///             needs_approval => [draft, approved],
///         },
///         approved => retired,
///     },
///     retired => none,
/// };
/// assert_eq!(config.len(), 3);
/// ```
#[macro_export]
macro_rules! states {
    ( $( $name:ident => $target:tt ),* $(,)? ) => {
        $crate::config::StateConfig::new()
            $( .state(stringify!($name), $crate::__state_target!($target)) )*
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __state_target {
    (none) => {
        $crate::config::Targets::None
    };
    (()) => {
        $crate::config::Targets::None
    };
    (*) => {
        $crate::config::Targets::Wildcard
    };
    ([ $( $state:ident ),* $(,)? ]) => {
        $crate::config::Targets::List(vec![ $( $crate::core::StateId::from(stringify!($state)) ),* ])
    };
    ({ $( $inner:tt )* }) => {
        $crate::config::Targets::Group($crate::states! { $( $inner )* })
    };
    ($state:ident) => {
        $crate::config::Targets::List(vec![$crate::core::StateId::from(stringify!($state))])
    };
}

#[cfg(test)]
mod tests {
    use crate::config::{StateConfig, Targets};
    use crate::core::StateTree;

    #[test]
    fn states_macro_matches_fluent_config() {
        let from_macro = states! {
            draft => beta,
            beta => {
                needs_testing => needs_approval,
                needs_approval => [draft, approved],
            },
            approved => *,
            retired => none,
            archived => (),
        };

        let fluent = StateConfig::new()
            .state("draft", "beta")
            .state(
                "beta",
                StateConfig::new()
                    .state("needs_testing", "needs_approval")
                    .state("needs_approval", ["draft", "approved"]),
            )
            .state("approved", Targets::Wildcard)
            .state("retired", Targets::None)
            .state("archived", Targets::None);

        assert_eq!(from_macro, fluent);
    }

    #[test]
    fn states_macro_configures_the_sentinel() {
        let config = states! {
            none => draft,
            draft => done,
            done => none,
        };
        let tree = StateTree::build("state", &config, &[]).unwrap();

        assert!(tree.can_transition("none", "draft"));
        assert!(!tree.can_transition("none", "done"));
    }

    #[test]
    fn states_macro_accepts_trailing_entries_without_comma() {
        let config = states! { only => none };
        assert_eq!(config.len(), 1);
    }
}
