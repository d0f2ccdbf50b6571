use crumb::{cli, logging};

fn main() {
    logging::init();
    cli::run();
}
