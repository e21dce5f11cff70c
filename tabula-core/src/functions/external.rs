use std::process::Command;

use tracing::warn;

use super::{CallError, rejected};
use crate::{
    eval::{EvalErrorKind, Evaluator},
    value::Value,
};

/// Runs a program and returns its stdout on one line
///
/// Off unless [Config::allow_exec](crate::Config::allow_exec) is set. The
/// child is waited on before returning.
pub fn exec(ctx: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    if !ctx.config().allow_exec {
        return Err(EvalErrorKind::ExecDisabled.into());
    }
    let [Value::Str(command), rest @ ..] = args else {
        return Err(rejected(args));
    };
    let rest = rest.iter().filter_map(Value::as_str).collect::<Vec<_>>();

    warn!(%command, args = ?rest, "running external command");
    let failed = |reason: String| EvalErrorKind::Exec {
        command: command.clone(),
        reason,
    };
    let output = Command::new(command)
        .args(&rest)
        .output()
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("{}: {}", output.status, stderr.trim())).into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Value::Str(stdout.replace('\n', " ").trim().to_string()))
}
