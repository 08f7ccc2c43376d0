use std::process::ExitCode;

use tg_bot_commons::start_everything_with_default_log;

fn main() -> ExitCode {
    start_everything_with_default_log(
        "warn,tg_bot_commons=info,ws_forwarder=debug",
        ws_forwarder::entry(),
    )
}
