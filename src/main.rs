use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    chatops::cli::main()
}
