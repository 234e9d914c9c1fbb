//! Compose-convention `${VAR}` / `${VAR:-default}` substitution, applied to
//! the raw document text before YAML parsing.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ComposeError;

pub fn interpolate(raw: &str, env: &HashMap<String, String>, path: &Path) -> Result<String, ComposeError> {
    let mut out = String::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            let close = raw[i + 2..]
                .find('}')
                .map(|offset| i + 2 + offset)
                .ok_or_else(|| ComposeError::UnterminatedVariable {
                    path: path.to_path_buf(),
                })?;
            let expr = &raw[i + 2..close];
            out.push_str(&resolve(expr, env, path)?);
            i = close + 1;
        } else if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
            out.push('$');
            i += 2;
        } else {
            let ch = raw[i..].chars().next().expect("valid utf8 boundary");
            out.push(ch);
            i += ch.len_utf8();
        }
    }

    Ok(out)
}

fn resolve(expr: &str, env: &HashMap<String, String>, path: &Path) -> Result<String, ComposeError> {
    if let Some((name, default)) = expr.split_once(":-") {
        return Ok(env.get(name).cloned().unwrap_or_else(|| default.to_string()));
    }
    if let Some((name, default)) = expr.split_once('-') {
        if let Some(value) = env.get(name) {
            return Ok(value.clone());
        }
        return Ok(default.to_string());
    }

    env.get(expr).cloned().ok_or_else(|| ComposeError::UndefinedVariable {
        path: path.to_path_buf(),
        name: expr.to_string(),
    })
}
