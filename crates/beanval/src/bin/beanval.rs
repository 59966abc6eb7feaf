//! beanval - Run the valuation pass over a JSON directive list.

fn main() -> std::process::ExitCode {
    beanval::cmd::revalue::main()
}
