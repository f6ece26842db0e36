//! # Approval Service サーバー
//!
//! 多段階承認ワークフローを実行する内部サービス。
//!
//! ## 役割
//!
//! - **申請管理**: 休暇・経費・人事評価・その他の申請の作成と照会
//! - **承認エンジン**: 順次承認、却下カスケード、担当変更、ステップ挿入
//! - **変更申請**: 論理削除ライフサイクル付きの対となる申請名前空間
//!
//! ## アクセス制御
//!
//! 本サービスは内部ネットワークからのみアクセス可能とする。
//! 認証は上流で完了しており、操作主体はリクエストの
//! `userId` / `role` で受け取る。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APP_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `APP_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//!
//! ## 起動方法
//!
//! ```bash
//! APP_PORT=3001 DATABASE_URL=postgres://... cargo run -p shinsei-approval-service
//! ```

mod config;
mod error;
mod handler;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use config::AppConfig;
use handler::{
    ApprovalState,
    ChangeRequestState,
    act_on_approval,
    act_on_change_request,
    create_approval,
    create_change_request,
    delete_approval,
    get_approval,
    get_change_request,
    health_check,
    list_all_approvals,
    list_change_requests,
    list_my_approvals,
    list_pending_approvals,
    permanently_delete_change_request,
    readiness_check,
    restore_change_request,
    soft_delete_change_request,
};
use shinsei_domain::clock::SystemClock;
use shinsei_infra::{
    db,
    notification::NoopNotifier,
    repository::{
        PostgresAppraisalPeriodRepository,
        PostgresApprovalRequestRepository,
        PostgresChangeRequestRepository,
    },
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usecase::{ApprovalUseCaseImpl, ChangeRequestUseCaseImpl};

/// Approval Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shinsei=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 設定読み込み
    let config = AppConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "Approval Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    tracing::info!("データベースに接続しました");

    // マイグレーション実行
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションに失敗しました");

    // 依存コンポーネントを初期化
    let notifier = Arc::new(NoopNotifier::new());
    let clock = Arc::new(SystemClock);

    let approval_usecase = ApprovalUseCaseImpl::new(
        PostgresApprovalRequestRepository::new(pool.clone()),
        PostgresAppraisalPeriodRepository::new(pool.clone()),
        notifier,
        clock.clone(),
    );
    let approval_state = Arc::new(ApprovalState {
        usecase: approval_usecase,
    });

    let change_request_usecase = ChangeRequestUseCaseImpl::new(
        PostgresChangeRequestRepository::new(pool.clone()),
        clock,
    );
    let change_request_state = Arc::new(ChangeRequestState {
        usecase: change_request_usecase,
    });

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(pool)
        // 承認申請 API
        .route(
            "/approvals",
            post(
                create_approval::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .route(
            "/approvals/my-approvals",
            get(
                list_my_approvals::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .route(
            "/approvals/pending",
            get(
                list_pending_approvals::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .route(
            "/approvals/all",
            get(
                list_all_approvals::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .route(
            "/approvals/{id}",
            get(
                get_approval::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            )
            .delete(
                delete_approval::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .route(
            "/approvals/{id}/approve",
            patch(
                act_on_approval::<
                    PostgresApprovalRequestRepository,
                    PostgresAppraisalPeriodRepository,
                >,
            ),
        )
        .with_state(approval_state)
        // 変更申請 API
        .route(
            "/change-requests",
            post(create_change_request::<PostgresChangeRequestRepository>)
                .get(list_change_requests::<PostgresChangeRequestRepository>),
        )
        .route(
            "/change-requests/{id}",
            get(get_change_request::<PostgresChangeRequestRepository>)
                .delete(soft_delete_change_request::<PostgresChangeRequestRepository>),
        )
        .route(
            "/change-requests/{id}/approve",
            patch(act_on_change_request::<PostgresChangeRequestRepository>),
        )
        .route(
            "/change-requests/{id}/restore",
            post(restore_change_request::<PostgresChangeRequestRepository>),
        )
        .route(
            "/change-requests/{id}/permanent",
            delete(permanently_delete_change_request::<PostgresChangeRequestRepository>),
        )
        .with_state(change_request_state)
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Approval Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
