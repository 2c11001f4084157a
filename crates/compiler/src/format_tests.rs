// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{compile_str, format_source, CompileResult};

const SOURCE: &str = r#"
stage STAGE_A(in int x, out string y)
{
    src py "a.py"
    retain(y)
}
pipeline PIPE(in int x, out string y)
{
    call STAGE_A a(x = self.x)
    return (y = a.y)
}
call PIPE(x = 3)
"#;

fn compiled(src: &str) -> mro_core::CompiledAst {
    match compile_str(src, "t.mro") {
        CompileResult::Ok(ast) => ast,
        other => panic!("expected successful compile, got {:?}", other),
    }
}

#[test]
fn format_then_reparse_then_format_is_idempotent() {
    let first = compiled(SOURCE);
    let rendered_once = format_source(&first);

    let second = compiled(&rendered_once);
    let rendered_twice = format_source(&second);

    assert_eq!(rendered_once, rendered_twice);
}

#[test]
fn format_renders_stage_clauses() {
    let ast = compiled(SOURCE);
    let rendered = format_source(&ast);
    assert!(rendered.contains("src py \"a.py\""));
    assert!(rendered.contains("retain(y)"));
    assert!(rendered.contains("call STAGE_A a(x = self.x)"));
    assert!(rendered.contains("return (y = a.y)"));
}
