use clap::CommandFactory;
use clap_complete::generate;

/// Print shell completions for `hostapp` to stdout.
pub fn completions(shell: clap_complete::Shell) {
    let mut cmd = crate::Cli::command();
    generate(shell, &mut cmd, "hostapp", &mut std::io::stdout());
}
