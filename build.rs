use anyhow::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

pub fn main() -> Result<(), Error> {
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-env-changed=VERGEN_GIT_SHA");

    // container builds have no .git, so the sha is passed in from outside.
    match std::env::var("VERGEN_GIT_SHA") {
        Ok(sha) if !sha.is_empty() && sha != "unknown" => {
            println!("cargo:rustc-env=VERGEN_GIT_SHA={sha}");
        }
        _ => {
            let gitcl = GitclBuilder::default().sha(true).build()?;
            Emitter::default().add_instructions(&gitcl)?.emit()?;
        }
    }

    Ok(())
}
