// Prints the sweep Makefile for the parameter names given as arguments.
// Usage: benchmark-makefile-gen n tgx tgy impl > Makefile

fn main() {
    sweepgen::cli::init_logging();
    sweepgen::cli::run_benchmark_makefile_gen();
}
