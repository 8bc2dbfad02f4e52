fn main() {
    sweepgen::cli::init_logging();
    sweepgen::cli::run();
}
