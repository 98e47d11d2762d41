//! Privilege elevation strategies.
//!
//! Mutating commands for system-wide managers (apt, dnf, yum) need root.
//! How that is obtained depends on where the engine is embedded: a terminal
//! front-end can let `sudo` prompt, a headless caller cannot. The strategy
//! is chosen once at engine construction; backends and the executor stay
//! platform-agnostic.

/// Decision for a root-privileged command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Run this argv. The elevation prefix, if any, is already applied.
    Proceed(Vec<String>),
    /// Do not run. `command` is the exact line the user must run manually.
    Refuse {
        /// Full command line including the elevation prefix.
        command: String,
    },
}

/// Strategy consulted before running a root-privileged command.
pub trait Elevation: Send + Sync {
    /// Authorize or refuse `program args...` at root privilege.
    fn authorize(&self, program: &str, args: &[String]) -> Authorization;
}

/// Prefix root commands with `sudo` and let it prompt on the terminal.
///
/// The prompt blocks, which is acceptable for interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoPrompt;

impl Elevation for SudoPrompt {
    fn authorize(&self, program: &str, args: &[String]) -> Authorization {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push("sudo".to_string());
        argv.push(program.to_string());
        argv.extend(args.iter().cloned());
        Authorization::Proceed(argv)
    }
}

/// Never prompt. Refuses every root command and surfaces the exact line to
/// run manually, for callers with no terminal to prompt on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Elevation for Headless {
    fn authorize(&self, program: &str, args: &[String]) -> Authorization {
        Authorization::Refuse {
            command: render_root_command(program, args),
        }
    }
}

/// Render the sudo form of a command, for refusal messages and logs.
pub fn render_root_command(program: &str, args: &[String]) -> String {
    let mut line = String::from("sudo ");
    line.push_str(program);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn sudo_prompt_prefixes_argv() {
        let auth = SudoPrompt.authorize("apt-get", &args(&["install", "-y", "firefox"]));
        assert_eq!(
            auth,
            Authorization::Proceed(args(&["sudo", "apt-get", "install", "-y", "firefox"]))
        );
    }

    #[test]
    fn headless_refuses_with_exact_command() {
        let auth = Headless.authorize("apt-get", &args(&["install", "-y", "firefox"]));
        assert_eq!(
            auth,
            Authorization::Refuse {
                command: "sudo apt-get install -y firefox".to_string()
            }
        );
    }

    #[test]
    fn render_handles_no_args() {
        assert_eq!(render_root_command("dnf", &[]), "sudo dnf");
    }
}
