fn main() {
    if let Err(e) = district_analyzer_lib::run() {
        eprintln!("启动失败: {:#}", e);
        std::process::exit(1);
    }
}
