// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for §8 invariants 1 and 2 (compiler determinism, format
//! idempotence).

use crate::{compile_str, format_source, CompileResult};
use proptest::prelude::*;

fn source_with_literal(x: i64) -> String {
    format!(
        r#"
        stage STAGE_A(in int x, out int y)
        {{
            src py "a.py"
        }}
        pipeline PIPE(in int x, out int y)
        {{
            call STAGE_A a(x = {x})
            return (y = a.y)
        }}
        call PIPE(x = {x})
        "#
    )
}

proptest! {
    #[test]
    fn compiling_the_same_source_twice_yields_the_same_callable_order(x in -1_000_000i64..1_000_000) {
        let src = source_with_literal(x);
        let first = compile_str(&src, "t.mro").into_ast().unwrap();
        let second = compile_str(&src, "t.mro").into_ast().unwrap();
        let order = |ast: &mro_core::CompiledAst| -> Vec<String> {
            ast.ast.callables.iter().map(|c| ast.symbols.resolve(c.id()).to_string()).collect()
        };
        prop_assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn format_is_idempotent_across_arbitrary_int_literals(x in -1_000_000i64..1_000_000) {
        let src = source_with_literal(x);
        let compiled = match compile_str(&src, "t.mro") {
            CompileResult::Ok(ast) => ast,
            other => panic!("expected successful compile, got {:?}", other),
        };
        let once = format_source(&compiled);
        let recompiled = match compile_str(&once, "t.mro") {
            CompileResult::Ok(ast) => ast,
            other => panic!("reformatted source failed to recompile: {:?}", other),
        };
        let twice = format_source(&recompiled);
        prop_assert_eq!(once, twice);
    }
}
