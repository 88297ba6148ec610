// ABOUTME: Shared test support: scripted command runner and closure-backed HTTP probe.
// ABOUTME: Lets pipeline stages run without the real external tools or endpoints.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

use skiff::exec::{CommandRunner, ExecError, ExecOutput, ExecRequest};
use skiff::verify::{HttpProbe, ProbeError, ProbeRequest, ProbeResponse};

/// A command runner that replays a scripted sequence of outputs.
///
/// Responses are consumed in call order; when the script runs dry the
/// last response repeats, which models a poll loop observing a stable
/// state. Every request is recorded for assertions.
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<ExecOutput>>,
    last: Mutex<Option<ExecOutput>>,
    requests: Mutex<Vec<ExecRequest>>,
}

impl ScriptedRunner {
    pub fn new(responses: Vec<ExecOutput>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Full command lines in invocation order (ignores redaction).
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(raw_display)
            .collect()
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn raw_display(request: &ExecRequest) -> String {
    if request.args.is_empty() {
        request.program.clone()
    } else {
        format!("{} {}", request.program, request.args.join(" "))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, request: &ExecRequest) -> Result<ExecOutput, ExecError> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(output) => {
                *self.last.lock().unwrap() = Some(output.clone());
                Ok(output)
            }
            None => match self.last.lock().unwrap().clone() {
                Some(output) => Ok(output),
                None => panic!("no scripted response for {}", raw_display(request)),
            },
        }
    }
}

pub fn ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(code: i32, stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// HTTP probe backed by a plain closure.
pub struct FnProbe<F>(pub F);

#[async_trait]
impl<F> HttpProbe for FnProbe<F>
where
    F: Fn(&ProbeRequest) -> Result<ProbeResponse, ProbeError> + Send + Sync,
{
    async fn request(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeError> {
        (self.0)(request)
    }
}

pub fn response(status: u16, body: &str) -> ProbeResponse {
    ProbeResponse {
        status,
        body: body.to_string(),
    }
}

static STUB_TOOLS: OnceLock<()> = OnceLock::new();

/// Append a directory of stub executables (terraform, aws, docker,
/// kubectl, helm) to PATH so prerequisite checks pass in tests. The
/// stubs are never executed; stages run against scripted runners.
pub fn ensure_stub_tools() {
    STUB_TOOLS.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("skiff-stub-tools-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        for tool in ["terraform", "aws", "docker", "kubectl", "helm"] {
            let path = dir.join(tool);
            std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        let old = std::env::var("PATH").unwrap_or_default();
        // Appended, so real tools still win when present.
        unsafe {
            std::env::set_var("PATH", format!("{old}:{}", dir.display()));
        }
    });
}
