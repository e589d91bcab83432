//! Sign-in flow demonstration.
//!
//! This example walks one user through a session behind an interceptor:
//! 1. Store an encrypted password
//! 2. Sign in and receive the session cookie
//! 3. Present the cookie on a later request guarded by an interceptor
//! 4. Sign out and replay the old cookie
//!
//! Run with: `cargo run --example sign_in_flow`

use std::sync::Arc;

use interlock::{
    Cookie, Dispatch, HandlerError, HandlerMethod, HandlerType, InMemoryUserStore, Interceptor,
    InterceptorBinding, InterceptorPipeline, InterceptorResolver, MarkerRegistry, RequestContext,
    SecretKeyStore, SessionConfig, SessionManager, SessionUser, StaticContainer, SymmetricCrypto,
    ViewResult,
};

/// Marker for operations that need a signed-in user
struct RequireLogin;

/// Vetoes requests without a valid session cookie
struct LoginCheck {
    session: Arc<SessionManager<()>>,
}

impl Interceptor for LoginCheck {
    fn pre_handle(
        &self,
        ctx: &mut RequestContext,
        _handler: &HandlerMethod,
    ) -> Result<bool, HandlerError> {
        Ok(self.session.get_user(ctx).is_ok())
    }

    fn name(&self) -> &'static str {
        "login-check"
    }
}

fn request_with(id: &str, cookie: &Cookie) -> RequestContext {
    RequestContext::new(id).with_header("Cookie", format!("{}={}", cookie.name, cookie.value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let crypto = Arc::new(SymmetricCrypto::new(&SecretKeyStore::generate()));
    let store = Arc::new(InMemoryUserStore::<()>::new());
    let session = Arc::new(SessionManager::new(
        SessionConfig::new("example.com"),
        crypto,
        store.clone(),
    ));

    // Step 1: store alice with an encrypted password
    store.insert_user(SessionUser::new("alice").with_password(session.encrypt_password("secret")?));
    println!("1. Stored user 'alice'");

    // Step 2: sign in
    let mut cookies: Vec<Cookie> = Vec::new();
    let user = session.sign_in(&mut RequestContext::new("req-1"), "alice", "secret", &mut cookies)?;
    let issued = cookies.remove(0);
    println!("2. ✓ Signed in as {}", user.username());
    println!("   Set-Cookie: {}", issued.to_header_value());

    // Step 3: a guarded operation
    let container = StaticContainer::new().register(
        Some("loginCheck"),
        LoginCheck {
            session: Arc::clone(&session),
        },
    );
    let registry = MarkerRegistry::new()
        .with::<RequireLogin>(InterceptorBinding::from_container_id::<LoginCheck>("loginCheck"));
    let resolver = InterceptorResolver::new(registry).with_container(Arc::new(container));
    let pipeline = InterceptorPipeline::new(Arc::new(resolver));

    let orders = Arc::new(HandlerType::new("OrderController").annotate(RequireLogin));
    let list = HandlerMethod::new(&orders, "list");

    let mut ctx = request_with("req-2", &issued);
    let outcome = pipeline.execute(&mut ctx, &list, |ctx| {
        let who = session.current_user(ctx)?;
        let mut view = ViewResult::named("orders");
        view.model.insert("user".to_string(), who.username().to_string());
        Ok(Some(view))
    })?;
    println!("3. ✓ {} -> {:?}", list, outcome);

    // Step 4: sign out, then replay the old cookie
    let mut expired: Vec<Cookie> = Vec::new();
    session.sign_out(&mut request_with("req-3", &issued), &mut expired)?;
    println!("4. Signed out");
    println!("   Set-Cookie: {}", expired[0].to_header_value());

    let mut replay = request_with("req-4", &issued);
    let outcome = pipeline.execute(&mut replay, &list, |_| Ok(None))?;
    assert_eq!(outcome, Dispatch::Vetoed);
    println!("   ✗ Replayed cookie vetoed");

    Ok(())
}
