//! Interpreter for compiled bodies.
//!
//! Evaluation is capability-injected: identifiers resolve only against
//! the timing bindings in [`ExecContext`], and call targets only against
//! the primitive table below. There is no ambient lookup of any kind, so
//! an artifact can reference exactly what its execution context grants
//! and nothing else.

use serde_json::Value;

use scenesmith_core::callform::Expr;
use scenesmith_core::capability::MEDIA_STUB;
use scenesmith_core::error::PipelineError;

use crate::element::{Element, ElementKind, Props};

/// Timing bindings injected for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ExecContext {
    pub frame: f64,
    pub fps: u32,
    pub duration_frames: u32,
}

impl ExecContext {
    pub fn new(frame: f64, fps: u32, duration_frames: u32) -> Self {
        Self {
            frame,
            fps,
            duration_frames,
        }
    }

    fn binding(&self, name: &str) -> Option<f64> {
        match name {
            "frame" => Some(self.frame),
            "fps" => Some(self.fps as f64),
            "duration_frames" => Some(self.duration_frames as f64),
            _ => None,
        }
    }

    /// The same context with the frame shifted into a sequence window.
    fn shifted(&self, offset: f64) -> Self {
        Self {
            frame: self.frame - offset,
            ..*self
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ExecutionError {
    #[error("Unknown primitive '{0}'")]
    UnknownPrimitive(String),

    #[error("Unknown binding '{0}'")]
    UnknownBinding(String),

    #[error("Bad argument to '{primitive}': {detail}")]
    BadArgument {
        primitive: &'static str,
        detail: String,
    },

    #[error("'{0}' cannot appear in a value position")]
    ElementInValuePosition(String),
}

impl From<ExecutionError> for PipelineError {
    fn from(e: ExecutionError) -> Self {
        PipelineError::ExecutionFailed(e.to_string())
    }
}

/// Evaluate a compiled body at one frame, producing an element tree.
pub fn evaluate(body: &Expr, ctx: &ExecContext) -> Result<Element, ExecutionError> {
    eval_element(body, ctx)
}

fn eval_element(expr: &Expr, ctx: &ExecContext) -> Result<Element, ExecutionError> {
    let Expr::Call { target, args } = expr else {
        return Err(ExecutionError::BadArgument {
            primitive: "child",
            detail: "children must be element calls".into(),
        });
    };

    match target.as_str() {
        "stage" => container(ElementKind::Stage, args, ctx),
        "box" => container(ElementKind::Box, args, ctx),
        "text" => container(ElementKind::Text, args, ctx),
        "sequence" => sequence(args, ctx),
        "image" | "video" | "audio" | "font" | "icon" => {
            container(ElementKind::Media(target.clone()), args, ctx)
        }
        other if other == MEDIA_STUB => media_stub(args, ctx),
        other => Err(ExecutionError::UnknownPrimitive(other.to_string())),
    }
}

/// `prim(props, children)` for every element primitive.
fn container(
    kind: ElementKind,
    args: &[Expr],
    ctx: &ExecContext,
) -> Result<Element, ExecutionError> {
    let (props_expr, children_expr) = two_args(&kind, args)?;
    let props = eval_props(props_expr, ctx)?;
    let children = eval_children(children_expr, ctx)?;
    Ok(Element::new(kind).with_props(props).with_children(children))
}

/// `media_stub("kind", props, children)`.
fn media_stub(args: &[Expr], ctx: &ExecContext) -> Result<Element, ExecutionError> {
    let [Expr::Str(kind), props_expr, children_expr] = args else {
        return Err(ExecutionError::BadArgument {
            primitive: "media_stub",
            detail: format!("expected (kind, props, children), got {} args", args.len()),
        });
    };
    let props = eval_props(props_expr, ctx)?;
    let children = eval_children(children_expr, ctx)?;
    Ok(Element::new(ElementKind::MediaStub(kind.clone()))
        .with_props(props)
        .with_children(children))
}

/// `sequence(props, children)`: children render only inside the window
/// `[from, from + durationFrames)`, and see a window-local frame.
fn sequence(args: &[Expr], ctx: &ExecContext) -> Result<Element, ExecutionError> {
    let (props_expr, children_expr) = two_args(&ElementKind::Sequence, args)?;
    let props = eval_props(props_expr, ctx)?;

    let from = prop_number(&props, "from").unwrap_or(0.0);
    let duration = prop_number(&props, "durationFrames")
        .or_else(|| prop_number(&props, "duration_frames"))
        .unwrap_or(ctx.duration_frames as f64 - from);

    if ctx.frame < from || ctx.frame >= from + duration {
        return Ok(Element::empty().with_props(props));
    }

    let local = ctx.shifted(from);
    let children = eval_children(children_expr, &local)?;
    Ok(Element::new(ElementKind::Sequence)
        .with_props(props)
        .with_children(children))
}

fn prop_number(props: &Props, key: &str) -> Option<f64> {
    props.get(key).and_then(Value::as_f64)
}

fn two_args<'a>(
    kind: &ElementKind,
    args: &'a [Expr],
) -> Result<(&'a Expr, &'a Expr), ExecutionError> {
    match args {
        [props, children] => Ok((props, children)),
        _ => Err(ExecutionError::BadArgument {
            primitive: "element",
            detail: format!("{kind:?} expects (props, children), got {} args", args.len()),
        }),
    }
}

fn eval_props(expr: &Expr, ctx: &ExecContext) -> Result<Props, ExecutionError> {
    let Expr::Map(entries) = expr else {
        return Err(ExecutionError::BadArgument {
            primitive: "element",
            detail: "props must be a map".into(),
        });
    };
    let mut props = Props::new();
    for (key, value) in entries {
        props.insert(key.clone(), eval_value(value, ctx)?);
    }
    Ok(props)
}

fn eval_children(expr: &Expr, ctx: &ExecContext) -> Result<Vec<Element>, ExecutionError> {
    let Expr::List(items) = expr else {
        return Err(ExecutionError::BadArgument {
            primitive: "element",
            detail: "children must be a list".into(),
        });
    };
    items.iter().map(|item| eval_element(item, ctx)).collect()
}

/// Evaluate an expression in a value position (prop values, call args).
fn eval_value(expr: &Expr, ctx: &ExecContext) -> Result<Value, ExecutionError> {
    match expr {
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Num(n) => Ok(number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Ident(name) => ctx
            .binding(name)
            .map(number)
            .ok_or_else(|| ExecutionError::UnknownBinding(name.clone())),
        Expr::Call { target, args } => match target.as_str() {
            "interpolate" => interpolate(args, ctx).map(number),
            "ease" => ease(args, ctx).map(number),
            other => Err(ExecutionError::ElementInValuePosition(other.to_string())),
        },
        Expr::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval_value(value, ctx)?);
            }
            Ok(Value::Object(map))
        }
        Expr::List(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| eval_value(item, ctx))
                .collect::<Result<_, _>>()?,
        )),
    }
}

/// `interpolate(input, in_start, in_end, out_start, out_end)`: linear map
/// with the output clamped to its range.
fn interpolate(args: &[Expr], ctx: &ExecContext) -> Result<f64, ExecutionError> {
    let values = numeric_args("interpolate", args, 5, ctx)?;
    let (input, in_start, in_end, out_start, out_end) =
        (values[0], values[1], values[2], values[3], values[4]);

    if in_end == in_start {
        return Err(ExecutionError::BadArgument {
            primitive: "interpolate",
            detail: "input range is empty".into(),
        });
    }

    let t = (input - in_start) / (in_end - in_start);
    let raw = out_start + t * (out_end - out_start);
    let (lo, hi) = if out_start <= out_end {
        (out_start, out_end)
    } else {
        (out_end, out_start)
    };
    Ok(raw.clamp(lo, hi))
}

/// `ease(t)` or `ease(t, "in" | "out" | "in_out")`: cubic easing over a
/// clamped 0..1 progress value.
fn ease(args: &[Expr], ctx: &ExecContext) -> Result<f64, ExecutionError> {
    let (t_expr, kind) = match args {
        [t] => (t, "in_out"),
        [t, Expr::Str(kind)] => (t, kind.as_str()),
        _ => {
            return Err(ExecutionError::BadArgument {
                primitive: "ease",
                detail: "expected (t) or (t, kind)".into(),
            })
        }
    };

    let t = as_number("ease", eval_value(t_expr, ctx)?)?.clamp(0.0, 1.0);
    match kind {
        "in" => Ok(t * t * t),
        "out" => {
            let inv = 1.0 - t;
            Ok(1.0 - inv * inv * inv)
        }
        "in_out" => Ok(if t < 0.5 {
            4.0 * t * t * t
        } else {
            let inv = -2.0 * t + 2.0;
            1.0 - inv * inv * inv / 2.0
        }),
        other => Err(ExecutionError::BadArgument {
            primitive: "ease",
            detail: format!("unknown easing kind '{other}'"),
        }),
    }
}

fn numeric_args(
    primitive: &'static str,
    args: &[Expr],
    expected: usize,
    ctx: &ExecContext,
) -> Result<Vec<f64>, ExecutionError> {
    if args.len() != expected {
        return Err(ExecutionError::BadArgument {
            primitive,
            detail: format!("expected {expected} arguments, got {}", args.len()),
        });
    }
    args.iter()
        .map(|arg| eval_value(arg, ctx).and_then(|v| as_number(primitive, v)))
        .collect()
}

fn as_number(primitive: &'static str, value: Value) -> Result<f64, ExecutionError> {
    value.as_f64().ok_or_else(|| ExecutionError::BadArgument {
        primitive,
        detail: format!("expected a number, got {value}"),
    })
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use scenesmith_core::callform::parse_assignment;

    fn body(text: &str) -> Expr {
        parse_assignment(text).unwrap().body
    }

    fn ctx(frame: f64) -> ExecContext {
        ExecContext::new(frame, 30, 60)
    }

    const SPINNING_LOGO: &str = r##"SpinningLogo := stage({"background": "#101018"}, [text({"content": "LOGO", "rotate": interpolate(frame, 0, 59, 0, 360)}, [])])"##;

    #[test]
    fn spinning_logo_at_frame_zero() {
        let tree = evaluate(&body(SPINNING_LOGO), &ctx(0.0)).unwrap();
        assert_eq!(tree.kind, ElementKind::Stage);
        assert_eq!(tree.props["background"], "#101018");
        assert_eq!(tree.children[0].props["rotate"], 0.0);
    }

    #[test]
    fn spinning_logo_at_final_frame() {
        let tree = evaluate(&body(SPINNING_LOGO), &ctx(59.0)).unwrap();
        assert_eq!(tree.children[0].props["rotate"], 360.0);
    }

    #[test]
    fn interpolate_clamps_outside_input_range() {
        let tree = evaluate(&body(SPINNING_LOGO), &ctx(500.0)).unwrap();
        assert_eq!(tree.children[0].props["rotate"], 360.0);
    }

    #[test]
    fn timing_bindings_resolve_from_context() {
        let tree = evaluate(
            &body(r#"X := text({"f": frame, "r": fps, "d": duration_frames}, [])"#),
            &ctx(12.0),
        )
        .unwrap();
        assert_eq!(tree.props["f"], 12.0);
        assert_eq!(tree.props["r"], 30.0);
        assert_eq!(tree.props["d"], 60.0);
    }

    #[test]
    fn unknown_binding_fails() {
        let err = evaluate(&body(r#"X := text({"w": screenWidth}, [])"#), &ctx(0.0)).unwrap_err();
        assert_matches!(err, ExecutionError::UnknownBinding(name) if name == "screenWidth");
    }

    #[test]
    fn unknown_primitive_fails() {
        let err = evaluate(&body("X := portal({}, [])"), &ctx(0.0)).unwrap_err();
        assert_matches!(err, ExecutionError::UnknownPrimitive(name) if name == "portal");
    }

    #[test]
    fn sequence_windows_children_in_time() {
        let text = r#"X := stage({}, [sequence({"from": 30, "durationFrames": 20}, [text({"at": frame}, [])])])"#;

        // Before the window: empty placeholder keeps the slot.
        let before = evaluate(&body(text), &ctx(10.0)).unwrap();
        assert_eq!(before.children[0].kind, ElementKind::Empty);

        // Inside the window: children see a window-local frame.
        let inside = evaluate(&body(text), &ctx(35.0)).unwrap();
        assert_eq!(inside.children[0].kind, ElementKind::Sequence);
        assert_eq!(inside.children[0].children[0].props["at"], 5.0);

        // Past the window end (exclusive).
        let past = evaluate(&body(text), &ctx(50.0)).unwrap();
        assert_eq!(past.children[0].kind, ElementKind::Empty);
    }

    #[test]
    fn media_and_stub_elements_evaluate() {
        let live = evaluate(&body(r#"X := image({"src": "a.png"}, [])"#), &ctx(0.0)).unwrap();
        assert_eq!(live.kind, ElementKind::Media("image".into()));

        let stub = evaluate(
            &body(r#"X := media_stub("image", {"src": "a.png"}, [])"#),
            &ctx(0.0),
        )
        .unwrap();
        assert_eq!(stub.kind, ElementKind::MediaStub("image".into()));
        assert_eq!(stub.props["src"], "a.png");
    }

    #[test]
    fn ease_kinds_are_monotonic_and_bounded() {
        for kind in ["in", "out", "in_out"] {
            let text = format!(r#"X := text({{"v": ease(interpolate(frame, 0, 59, 0, 1), "{kind}")}}, [])"#);
            let start = evaluate(&body(&text), &ctx(0.0)).unwrap().props["v"]
                .as_f64()
                .unwrap();
            let mid = evaluate(&body(&text), &ctx(30.0)).unwrap().props["v"]
                .as_f64()
                .unwrap();
            let end = evaluate(&body(&text), &ctx(59.0)).unwrap().props["v"]
                .as_f64()
                .unwrap();
            assert_eq!(start, 0.0, "{kind}");
            assert!(mid > 0.0 && mid < 1.0, "{kind}");
            assert_eq!(end, 1.0, "{kind}");
        }
    }

    #[test]
    fn unknown_ease_kind_fails() {
        let err = evaluate(&body(r#"X := text({"v": ease(0.5, "bounce")}, [])"#), &ctx(0.0))
            .unwrap_err();
        assert_matches!(err, ExecutionError::BadArgument { primitive: "ease", .. });
    }

    #[test]
    fn empty_input_range_fails() {
        let err = evaluate(
            &body(r#"X := text({"v": interpolate(frame, 10, 10, 0, 1)}, [])"#),
            &ctx(0.0),
        )
        .unwrap_err();
        assert_matches!(err, ExecutionError::BadArgument { primitive: "interpolate", .. });
    }

    #[test]
    fn element_call_in_value_position_fails() {
        let err = evaluate(&body(r#"X := text({"v": text({}, [])}, [])"#), &ctx(0.0)).unwrap_err();
        assert_matches!(err, ExecutionError::ElementInValuePosition(_));
    }
}
