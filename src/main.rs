fn main() -> std::process::ExitCode {
    paper_digest_lib::run()
}
