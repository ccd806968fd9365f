use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protocol::{PlayerId, PlayerInfo};
use quoridor_client::{
    AiDriver, ChannelClient, GameSettings, OnlineFlow, Phase, TurnController,
};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = GameSettings::load();

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                format!("quoridor_client={}", settings.log_level.as_directive()).parse()?,
            ),
        )
        .init();

    match std::env::args().nth(1).as_deref() {
        Some("online") => play_online(&settings).await,
        _ => play_local(&settings).await,
    }
}

/// 本地 AI 对 AI 演示
async fn play_local(settings: &GameSettings) -> Result<()> {
    info!("步步为营本地演示: {:?}", settings.game);

    let mut controller = TurnController::new();
    controller
        .start_local_pve(
            settings.game,
            settings.default_difficulty,
            settings.ai_backend,
            &mut rand::thread_rng(),
        )
        .context("对局配置无效")?;

    let opponent = AiDriver::from_settings(settings, settings.default_difficulty)?;
    // 1 号位也交给本地 AI
    let mut stand_in = AiDriver::local(settings.default_difficulty);
    if !settings.ai_think_delay {
        stand_in = stand_in.with_think_delay(Duration::ZERO);
    }

    while controller.phase() == Phase::Playing {
        if controller.should_ai_move() {
            if let Some(turn) = opponent.take_turn(&mut controller).await {
                if let Some(notice) = turn.notice {
                    warn!("{}", notice.message());
                }
            }
            continue;
        }

        let Some(snapshot) = controller.snapshot().cloned() else {
            break;
        };
        let turn = stand_in.play(&snapshot, PlayerId::One).await;
        controller.submit(turn.action, PlayerId::One)?;
    }

    report(&controller);
    if let Some(record) = controller.record() {
        info!("共 {} 步", record.actions.len());
    }
    Ok(())
}

/// 快速匹配一局联网对局，由本地 AI 代为行动
async fn play_online(settings: &GameSettings) -> Result<()> {
    let client = Arc::new(ChannelClient::connect(&settings.server_address, &settings.nickname).await?);
    let flow = OnlineFlow::new(client.clone(), PlayerInfo::new(settings.nickname.clone()));
    let driver = AiDriver::from_settings(settings, settings.default_difficulty)?;

    let mut controller = TurnController::new();
    info!("正在匹配对手...");
    let Some(mut game) = flow.quick_match(&mut controller, settings.game).await else {
        warn!("{}", controller.message().unwrap_or("匹配失败"));
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut ticks: u32 = 0;
    while controller.phase() == Phase::Playing {
        ticker.tick().await;
        game.poll(&mut controller);
        if client.is_closed() {
            controller.return_to_menu(Some("与服务器的连接已断开".to_string()));
            break;
        }

        if controller.is_my_turn() {
            if let Some(snapshot) = controller.snapshot().cloned() {
                let turn = driver.play(&snapshot, game.seat()).await;
                game.submit(&mut controller, turn.action).await?;
            }
            continue;
        }

        ticks += 1;
        if ticks % 10 == 0 {
            game.tick(&mut controller).await?;
        }
    }

    report(&controller);
    if client.is_closed() {
        return Ok(());
    }
    game.leave(&mut controller).await
}

fn report(controller: &TurnController) {
    match controller.result() {
        Some(result) => info!("对局结束: {} 获胜 ({:?})", result.winner, result.reason),
        None => warn!(
            "对局未完成: {}",
            controller.message().unwrap_or("未知原因")
        ),
    }
}
