//! SDL rendering of the generated surface.

use std::fmt::Write;

use crate::registry::{TypeRegistry, TypeSpec};

/// Render the registry as SDL text.
///
/// Builtin scalars are not re-declared; directives come first, then every
/// generated type in registry order.
pub fn render_sdl(registry: &TypeRegistry) -> String {
    let mut out = String::new();

    for directive in &registry.directives {
        let args: Vec<String> = directive
            .args
            .iter()
            .map(|a| format!("{}: {}", a.name, a.ty.render()))
            .collect();
        let _ = writeln!(
            out,
            "directive @{}({}) on {}",
            directive.name,
            args.join(", "),
            directive.locations.join(" | ")
        );
        out.push('\n');
    }

    for spec in &registry.types {
        match spec {
            TypeSpec::Scalar { .. } => continue,
            TypeSpec::Enum { name, values } => {
                let _ = writeln!(out, "enum {name} {{");
                for value in values {
                    let _ = writeln!(out, "    {value}");
                }
                out.push_str("}\n\n");
            }
            TypeSpec::Input { name, fields } => {
                let _ = writeln!(out, "input {name} {{");
                for field in fields {
                    let _ = writeln!(out, "    {}: {}", field.name, field.ty.render());
                }
                out.push_str("}\n\n");
            }
            TypeSpec::Object { name, fields } => {
                let _ = writeln!(out, "type {name} {{");
                for field in fields {
                    if field.args.is_empty() {
                        let _ = writeln!(out, "    {}: {}", field.name, field.ty.render());
                    } else {
                        let args: Vec<String> = field
                            .args
                            .iter()
                            .map(|a| format!("{}: {}", a.name, a.ty.render()))
                            .collect();
                        let _ = writeln!(
                            out,
                            "    {}({}): {}",
                            field.name,
                            args.join(", "),
                            field.ty.render()
                        );
                    }
                }
                out.push_str("}\n\n");
            }
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}
