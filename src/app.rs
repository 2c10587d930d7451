//! 应用程序初始化和启动
//!
//! 负责完整的启动流程，包括：
//! - 日志系统初始化
//! - 应用数据目录、配置与本地存储
//! - 各领域模块初始化
//! - 控制台交互循环（替代地图/页面界面）

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::commands::{self, CommandResult, RegisterForm};
use crate::community::PostDraft;
use crate::event_bus::AppEvent;
use crate::logger::{self, LogBroadcaster};
use crate::models::{PostCategory, PostFilter, StoreSettings};
use crate::settings::SettingsManager;
use crate::storage::{BlobStore, SqliteStore};
use crate::AppState;

/// 应用程序入口点
pub fn run() -> Result<()> {
    let app_dir = app_data_dir();

    // 创建日志广播器并初始化日志系统
    let log_broadcaster = Arc::new(LogBroadcaster::default());
    let _log_guard = logger::init_with_broadcaster(&app_dir.join("logs"), log_broadcaster.clone())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(start(app_dir, log_broadcaster))
}

/// 应用数据目录，可用 DISTRICT_ANALYZER_HOME 覆盖
fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DISTRICT_ANALYZER_HOME") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Application Support/district-analyzer")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("district-analyzer")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/district-analyzer")
    }
}

/// 打开本地存储，SQLite 不可用时退回内存存储
async fn open_store(app_dir: &Path, settings: &StoreSettings) -> BlobStore {
    let db_path = settings
        .db_path
        .as_ref()
        .map(PathBuf::from)
        .map(|path| if path.is_relative() { app_dir.join(path) } else { path })
        .unwrap_or_else(|| app_dir.join("district-analyzer.db"));

    match SqliteStore::new(&db_path.to_string_lossy()).await {
        Ok(store) => BlobStore::new(Arc::new(store)),
        Err(e) => {
            warn!("本地存储初始化失败，改用内存存储: {}", e);
            BlobStore::in_memory()
        }
    }
}

async fn start(app_dir: PathBuf, log_broadcaster: Arc<LogBroadcaster>) -> Result<()> {
    info!("初始化 상권분석...");

    let settings = Arc::new(SettingsManager::new(app_dir.join("config.json")).await?);
    let config = settings.get().await;
    let store = open_store(&app_dir, &config.store).await;

    // 共享的 HTTP 客户端（LLM 与帖子接口复用连接池）
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(10)
        .build()?;

    // 控制台模式下日志已输出到终端，不再重复推送
    log_broadcaster.set_enabled(false);

    let state = AppState::new(settings, store, log_broadcaster, http_client).await?;
    info!(
        "领域管理器已初始化完成，LLM provider: {}，本地存储: {}",
        state.analysis_domain.get_llm().provider_name().await,
        state.community_domain.get_store().store_type()
    );

    tokio::spawn(watch_events(state.event_bus.subscribe()));

    if let Err(e) = commands::load_posts(&state).await {
        warn!("初始帖子加载失败: {}", e);
    }

    console_loop(&state).await
}

/// 事件监听 - 控制台没有界面，只记录日志
async fn watch_events(mut receiver: broadcast::Receiver<AppEvent>) {
    loop {
        match receiver.recv().await {
            Ok(AppEvent::PageChanged {
                page,
                scroll_to_top: true,
            }) => {
                debug!("页码 {}，滚动到顶部", page);
            }
            Ok(event) => debug!("事件: {:?}", event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("事件监听落后，跳过 {} 条", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

const HELP: &str = r#"명령어:
  districts                      지역 목록
  select <지역>                  지도에서 지역 선택
  categories                     업종 분류 보기
  main <대분류> | sub <소분류>   업종 선택
  analyze                        상권 분석 요청
  result                         현재 분석 결과
  chat <메시지>                  AI 상담 (로그인 필요)
  input <메시지> | send           입력창에 쓰고 보내기
  history                        대화 기록
  posts                          게시글 새로고침
  filter <all|Free|Question|Review>
  page <번호>                    페이지 이동
  post <id>                      게시글 보기
  write <분류> <제목> | <내용>   글쓰기 (로그인 필요)
  delete <id>                    글 삭제
  register <아이디> <이메일> <비밀번호> <비밀번호확인>
  login <아이디> <비밀번호> | logout | whoami
  config                         설정 보기
  logs <on|off>                  로그 푸시 전환
  quit"#;

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("출력 실패: {}", e),
    }
}

fn print_result<T: Serialize>(result: CommandResult<T>) {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => eprintln!("{}", e),
    }
}

fn parse_filter(raw: &str) -> Option<PostFilter> {
    match raw.trim() {
        "" | "all" | "All" | "전체" => Some(PostFilter::All),
        other => PostCategory::parse(other).map(PostFilter::Only),
    }
}

/// 控制台交互循环
async fn console_loop(state: &AppState) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            "districts" => print_result(commands::list_districts().await),
            "select" => print_result(commands::select_district(state, rest).await),
            "categories" => print_result(commands::get_categories(state).await),
            "main" => print_result(commands::set_main_category(state, rest).await),
            "sub" => print_result(commands::set_sub_category(state, rest).await),
            "analyze" => print_result(commands::request_analysis(state).await),
            "result" => print_result(commands::get_analysis_result(state).await),
            "chat" => print_result(commands::send_chat_message(state, rest).await),
            "input" => print_result(commands::set_chat_input(state, rest).await),
            "send" => print_result(commands::send_chat_input(state).await),
            "history" => print_result(commands::get_conversation(state).await),
            "posts" => print_result(commands::load_posts(state).await),
            "filter" => match parse_filter(rest) {
                Some(filter) => print_result(commands::set_post_filter(state, filter).await),
                None => eprintln!("알 수 없는 분류: {}", rest),
            },
            "page" => match rest.parse::<usize>() {
                Ok(page) => {
                    print_result(commands::paginate(state, page).await);
                    print_result(commands::get_listing(state).await);
                }
                Err(_) => eprintln!("페이지 번호를 입력하세요"),
            },
            "post" => match rest.parse::<i64>() {
                Ok(id) => print_result(commands::get_post(state, id).await),
                Err(_) => eprintln!("게시글 번호를 입력하세요"),
            },
            "write" => {
                let (category, body) = rest.split_once(' ').unwrap_or((rest, ""));
                let (title, content) = body.split_once('|').unwrap_or((body, ""));
                match PostCategory::parse(category) {
                    Some(category) => print_result(
                        commands::create_post(
                            state,
                            PostDraft {
                                title: title.trim().to_string(),
                                content: content.trim().to_string(),
                                category,
                            },
                        )
                        .await,
                    ),
                    None => eprintln!("분류는 Free, Question, Review 중 하나입니다"),
                }
            }
            "delete" => match rest.parse::<i64>() {
                Ok(id) => print_result(commands::delete_post(state, id).await),
                Err(_) => eprintln!("게시글 번호를 입력하세요"),
            },
            "register" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if let [username, email, password, confirm] = parts.as_slice() {
                    print_result(
                        commands::register(
                            state,
                            RegisterForm {
                                username: username.to_string(),
                                email: email.to_string(),
                                password: password.to_string(),
                                confirm_password: confirm.to_string(),
                            },
                        )
                        .await,
                    );
                } else {
                    eprintln!("register <아이디> <이메일> <비밀번호> <비밀번호확인>");
                }
            }
            "login" => {
                let (username, password) = rest.split_once(' ').unwrap_or((rest, ""));
                print_result(commands::login(state, username, password.trim()).await);
            }
            "logout" => print_result(commands::logout(state).await),
            "whoami" => print_result(commands::current_user(state).await),
            "config" => print_result(commands::get_app_config(state).await),
            "logs" => match rest {
                "on" => print_result(commands::set_log_push_enabled(state, true).await),
                "off" => print_result(commands::set_log_push_enabled(state, false).await),
                _ => eprintln!("logs <on|off>"),
            },
            other => eprintln!("알 수 없는 명령어: {} (help 참고)", other),
        }
    }

    info!("退出");
    Ok(())
}
