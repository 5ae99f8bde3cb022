fn main() {
    if let Err(error) = task_manager_lib::run() {
        eprintln!("task-manager: {error}");
        std::process::exit(1);
    }
}
