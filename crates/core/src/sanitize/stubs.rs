//! Rule 5: media primitives become layout-preserving stubs.
//!
//! Restricted execution contexts (batch rendering) cannot load fonts,
//! icon packs, or media embeds. Instead of failing the artifact, each
//! configured media call is rewritten to `media_stub("<kind>", props,
//! children)`: the stub keeps the original props so the element's layout
//! footprint is unchanged, and keeps the children so nested structure
//! still renders.
//!
//! Applied at execution time, not during the stored compile: one stored
//! artifact serves both the interactive and the restricted strategy.

use crate::callform::Expr;
use crate::capability::{StubConfig, MEDIA_STUB};

/// Rewrite configured media calls into stub calls, recursively.
pub fn apply_restricted_stubs(expr: &Expr, config: &StubConfig) -> Expr {
    match expr {
        Expr::Call { target, args } => {
            let args: Vec<Expr> = args
                .iter()
                .map(|arg| apply_restricted_stubs(arg, config))
                .collect();
            if config.is_stubbed(target) {
                let mut stub_args = Vec::with_capacity(args.len() + 1);
                stub_args.push(Expr::Str(target.clone()));
                stub_args.extend(args);
                Expr::Call {
                    target: MEDIA_STUB.to_string(),
                    args: stub_args,
                }
            } else {
                Expr::Call {
                    target: target.clone(),
                    args,
                }
            }
        }
        Expr::Map(entries) => Expr::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), apply_restricted_stubs(v, config)))
                .collect(),
        ),
        Expr::List(items) => Expr::List(
            items
                .iter()
                .map(|item| apply_restricted_stubs(item, config))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callform::parse_assignment;

    fn body(text: &str) -> Expr {
        parse_assignment(text).unwrap().body
    }

    #[test]
    fn media_call_becomes_stub_with_kind_prefix() {
        let expr = body(r#"X := image({"src": "logo.png", "width": 200}, [])"#);
        let stubbed = apply_restricted_stubs(&expr, &StubConfig::default());
        match stubbed {
            Expr::Call { target, args } => {
                assert_eq!(target, MEDIA_STUB);
                assert_eq!(args[0], Expr::Str("image".into()));
                // Props survive so the layout footprint is unchanged.
                assert!(matches!(&args[1], Expr::Map(entries) if entries.len() == 2));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn containers_pass_through_untouched() {
        let expr = body(r##"X := stage({"background": "#000"}, [text({"content": "a"}, [])])"##);
        let stubbed = apply_restricted_stubs(&expr, &StubConfig::default());
        assert_eq!(stubbed, expr);
    }

    #[test]
    fn nested_media_inside_container_is_stubbed() {
        let expr = body(r#"X := stage({}, [audio({"src": "a.mp3"}, []), text({}, [])])"#);
        let stubbed = apply_restricted_stubs(&expr, &StubConfig::default());
        let mut calls = Vec::new();
        let mut idents = Vec::new();
        stubbed.collect_names(&mut calls, &mut idents);
        assert_eq!(calls, vec!["stage", MEDIA_STUB, "text"]);
    }

    #[test]
    fn children_of_stubbed_calls_are_kept_and_rewritten() {
        let expr = body(r#"X := font({"family": "Inter"}, [icon({"name": "play"}, [])])"#);
        let stubbed = apply_restricted_stubs(&expr, &StubConfig::default());
        let mut calls = Vec::new();
        let mut idents = Vec::new();
        stubbed.collect_names(&mut calls, &mut idents);
        assert_eq!(calls, vec![MEDIA_STUB, MEDIA_STUB]);
    }

    #[test]
    fn partial_config_stubs_only_listed_primitives() {
        let config = StubConfig::new(&["video"]).unwrap();
        let expr = body(r#"X := stage({}, [video({}, []), image({}, [])])"#);
        let stubbed = apply_restricted_stubs(&expr, &config);
        let mut calls = Vec::new();
        let mut idents = Vec::new();
        stubbed.collect_names(&mut calls, &mut idents);
        assert_eq!(calls, vec!["stage", MEDIA_STUB, "image"]);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let expr = body(r#"X := stage({}, [image({"src": "a.png"}, [])])"#);
        let once = apply_restricted_stubs(&expr, &StubConfig::default());
        let twice = apply_restricted_stubs(&once, &StubConfig::default());
        assert_eq!(once, twice);
    }
}
