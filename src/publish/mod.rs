// ABOUTME: Builds the application image and pushes it to the provisioned registry.
// ABOUTME: Registry auth uses short-lived credentials piped over stdin, never logged.

use std::path::PathBuf;

use crate::exec::{CommandRunner, ExecError, ExecRequest};

/// Everything needed to publish one image version.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    /// Local image name used for the build.
    pub name: String,
    /// Full repository URL from the provisioner (host/repo).
    pub repository: String,
    /// Version label.
    pub tag: String,
    /// Build context directory.
    pub context: PathBuf,
    /// Region for the credential-vending call.
    pub region: String,
}

impl ImageSpec {
    fn local_ref(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    fn remote_ref(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// Registry host portion of the repository URL.
    fn registry_host(&self) -> &str {
        self.repository
            .split('/')
            .next()
            .unwrap_or(&self.repository)
    }
}

pub struct ImagePublisher<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> ImagePublisher<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Authenticate, build, tag, push. Any failure aborts; there is no
    /// partial-success state worth recovering, a re-run rebuilds from
    /// layer cache.
    pub async fn publish(&self, spec: &ImageSpec) -> Result<(), ExecError> {
        let password = self.login_password(&spec.region).await?;
        self.login(spec, password).await?;
        self.build(spec).await?;
        self.tag(spec).await?;
        self.push(spec).await?;
        Ok(())
    }

    async fn login_password(&self, region: &str) -> Result<Vec<u8>, ExecError> {
        let request = ExecRequest::new(
            "aws",
            &["ecr", "get-login-password", "--region", region],
        );
        let output = self.runner.run(&request).await?.require_success(&request)?;
        Ok(output.stdout.trim().as_bytes().to_vec())
    }

    async fn login(&self, spec: &ImageSpec, password: Vec<u8>) -> Result<(), ExecError> {
        let request = ExecRequest::new(
            "docker",
            &[
                "login",
                "--username",
                "AWS",
                "--password-stdin",
                spec.registry_host(),
            ],
        )
        .with_stdin(password);
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }

    async fn build(&self, spec: &ImageSpec) -> Result<(), ExecError> {
        let local = spec.local_ref();
        let context = spec.context.display().to_string();
        let request =
            ExecRequest::new("docker", &["build", "-t", &local, &context]).streamed();
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }

    async fn tag(&self, spec: &ImageSpec) -> Result<(), ExecError> {
        let local = spec.local_ref();
        let remote = spec.remote_ref();
        let request = ExecRequest::new("docker", &["tag", &local, &remote]);
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }

    async fn push(&self, spec: &ImageSpec) -> Result<(), ExecError> {
        let remote = spec.remote_ref();
        let request = ExecRequest::new("docker", &["push", &remote]).streamed();
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }
}
