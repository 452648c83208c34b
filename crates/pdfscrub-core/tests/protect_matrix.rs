//! Every path through a protected scope, driven through the public context.

use pdfscrub_core::{
    Caught, CollectingSink, Context, ContextOptions, Diagnostic, Error, ErrorCode,
};

fn context() -> (Context, CollectingSink) {
    let sink = CollectingSink::new();
    (Context::with_sink(ContextOptions::default(), sink.clone()), sink)
}

#[test]
fn no_throw_no_cleanup() {
    let (mut ctx, _) = context();
    let outcome = ctx.protect(|_| Ok("done"));
    assert_eq!(outcome, Caught::Completed("done"));
    assert_eq!(outcome.resume_code(), 0);
    assert!(!outcome.enters_catch());
}

#[test]
fn no_throw_with_cleanup() {
    let (mut ctx, _) = context();
    let mut cleaned = false;
    let outcome = ctx.protect_with_cleanup(
        |_| Ok(1),
        |_| {
            cleaned = true;
            Ok(())
        },
    );
    assert!(cleaned);
    assert_eq!(outcome, Caught::CleanedUp(1));
    assert_eq!(outcome.resume_code(), 1);
    assert!(outcome.enters_catch());
    assert!(!outcome.is_caught());
}

#[test]
fn throw_in_body_no_cleanup() {
    let (mut ctx, _) = context();
    let outcome: Caught<()> = ctx.protect(|ctx| Err(ctx.throw(ErrorCode::Syntax, "bad")));
    assert!(matches!(outcome, Caught::Failed(ref e) if e.code() == ErrorCode::Syntax));
    assert_eq!(outcome.resume_code(), 2);
}

#[test]
fn throw_in_body_clean_cleanup() {
    let (mut ctx, _) = context();
    let mut cleaned = false;
    let outcome: Caught<()> = ctx.protect_with_cleanup(
        |ctx| Err(ctx.throw(ErrorCode::Format, "broken")),
        |_| {
            cleaned = true;
            Ok(())
        },
    );
    assert!(cleaned, "cleanup must run after a failing body");
    assert!(matches!(outcome, Caught::FailedThenCleaned(_)));
    assert_eq!(outcome.resume_code(), 3);
}

#[test]
fn clean_body_failing_cleanup() {
    let (mut ctx, _) = context();
    let outcome = ctx.protect_with_cleanup(
        |_| Ok(9),
        |ctx| Err(ctx.throw(ErrorCode::Generic, "cleanup broke")),
    );
    match &outcome {
        Caught::CleanupFailed { value, error } => {
            assert_eq!(*value, 9);
            assert_eq!(error.message(), "cleanup broke");
        }
        other => panic!("unexpected path {other:?}"),
    }
    assert_eq!(outcome.resume_code(), 3);
}

#[test]
fn failing_body_failing_cleanup() {
    let (mut ctx, sink) = context();
    let mut cleanup_runs = 0;
    let outcome: Caught<()> = ctx.protect_with_cleanup(
        |ctx| Err(ctx.throw(ErrorCode::Syntax, "first")),
        |ctx| {
            cleanup_runs += 1;
            Err(ctx.throw(ErrorCode::Font, "second"))
        },
    );
    assert_eq!(cleanup_runs, 1);
    match &outcome {
        Caught::FailedInBoth { body, cleanup } => {
            assert_eq!(body.code(), ErrorCode::Syntax);
            assert_eq!(cleanup.code(), ErrorCode::Font);
        }
        other => panic!("unexpected path {other:?}"),
    }
    assert_eq!(outcome.resume_code(), 5);
    assert_eq!(ctx.caught(), Some(ErrorCode::Font));
    assert_eq!(
        sink.diagnostics(),
        vec![
            Diagnostic::Error("first".into()),
            Diagnostic::Error("second".into())
        ]
    );
}

#[test]
fn the_two_code_three_paths_are_distinct() {
    let (mut ctx, _) = context();
    let a: Caught<u8> = ctx.protect_with_cleanup(|_| Err(Error::generic("x")), |_| Ok(()));
    let b: Caught<u8> = ctx.protect_with_cleanup(|_| Ok(0), |_| Err(Error::generic("x")));
    assert_eq!(a.resume_code(), b.resume_code());
    assert_ne!(a, b);
}

#[test]
fn nested_scopes_unwind_to_zero_depth() {
    let (mut ctx, _) = context();
    let outcome = ctx.protect(|ctx| {
        assert_eq!(ctx.errors().depth(), 1);
        let inner: Caught<()> = ctx.protect(|ctx| {
            assert_eq!(ctx.errors().depth(), 2);
            Err(Error::generic("inner"))
        });
        assert_eq!(ctx.errors().depth(), 1);
        Ok(inner.resume_code())
    });
    assert_eq!(outcome, Caught::Completed(2));
    assert_eq!(ctx.errors().depth(), 0);
}

fn nest(ctx: &mut Context, remaining: usize, deepest: &mut usize) -> Caught<()> {
    ctx.protect(|ctx| {
        *deepest = (*deepest).max(ctx.errors().depth());
        if remaining == 0 {
            return Ok(());
        }
        nest(ctx, remaining - 1, deepest).into_result()
    })
}

#[test]
fn frame_stack_exhaustion_is_catchable() {
    let sink = CollectingSink::new();
    let opts = ContextOptions {
        max_scope_depth: 8,
        ..ContextOptions::default()
    };
    let mut ctx = Context::with_sink(opts, sink.clone());
    let mut deepest = 0;
    let outcome = nest(&mut ctx, 20, &mut deepest);
    let err = outcome.error().cloned().expect("exhaustion must surface");
    assert_eq!(err.code(), ErrorCode::FrameStackExhausted);
    assert_eq!(deepest, 7);
    assert_eq!(ctx.errors().depth(), 0);
    // Reported once where it happened, then propagated without repeats.
    assert_eq!(sink.lines(), vec!["error: exception stack overflow!"]);
}

#[test]
fn exhaustion_still_runs_cleanup() {
    let opts = ContextOptions {
        max_scope_depth: 2,
        ..ContextOptions::quiet()
    };
    let mut ctx = Context::with_options(opts);
    let outcome = ctx.protect(|ctx| {
        let mut cleaned = false;
        let inner: Caught<()> = ctx.protect_with_cleanup(
            |_| panic!("body must be skipped"),
            |_| {
                cleaned = true;
                Ok(())
            },
        );
        Ok((inner.resume_code(), cleaned))
    });
    assert_eq!(outcome, Caught::Completed((3, true)));
}
