//! Property tests for the crypto strategies, session token handling and
//! interceptor ordering.

use std::sync::Arc;

use interlock::{
    AsymmetricCrypto, Cookie, CryptoStrategy, HandlerMethod, HandlerType,
    InMemoryUserStore, Interceptor, InterceptorBinding, InterceptorResolver, KeyPairStore,
    MarkerRegistry, RequestContext, SecretKeyStore, SessionConfig, SessionError, SessionManager,
    SessionUser, StaticContainer, SymmetricCrypto,
};
use proptest::prelude::*;

fn symmetric() -> SymmetricCrypto {
    SymmetricCrypto::new(&SecretKeyStore::new([42u8; 32], b"0123456789abcdef".to_vec()))
}

fn asymmetric() -> AsymmetricCrypto {
    AsymmetricCrypto::new(KeyPairStore::from_private_seed([7u8; 32]))
}

fn session_over(crypto: Arc<dyn CryptoStrategy>) -> SessionManager<()> {
    let store = Arc::new(InMemoryUserStore::new());
    let session = SessionManager::new(SessionConfig::new("example.com"), crypto, store.clone());
    store.insert_user(SessionUser::new("alice").with_password(session.encrypt_password("secret").unwrap()));
    let mut cookies: Vec<Cookie> = Vec::new();
    session
        .sign_in(&mut RequestContext::new("setup"), "alice", "secret", &mut cookies)
        .unwrap();
    session
}

fn with_token(token: &str) -> RequestContext {
    RequestContext::new("req").with_header("Cookie", format!("mytoken={}", token))
}

proptest! {
    /// Property: symmetric strategy round-trips any string
    #[test]
    fn proptest_symmetric_round_trip(plain in ".{0,200}") {
        let crypto = symmetric();
        let token = crypto.encrypt(&plain).unwrap();
        prop_assert_eq!(crypto.decrypt(&token).unwrap(), plain);
    }

    /// Property: asymmetric strategy round-trips any string
    #[test]
    fn proptest_asymmetric_round_trip(plain in ".{0,200}") {
        let crypto = asymmetric();
        let token = crypto.encrypt(&plain).unwrap();
        prop_assert_eq!(crypto.decrypt(&token).unwrap(), plain);
    }

    /// Property: arbitrary cookie values never authenticate
    #[test]
    fn proptest_random_token_is_not_signed_in(token in "[A-Za-z0-9_-]{0,120}") {
        for session in [session_over(Arc::new(symmetric())), session_over(Arc::new(asymmetric()))] {
            let mut ctx = with_token(&token);
            prop_assert_eq!(session.get_user(&mut ctx).unwrap_err(), SessionError::NotSignedIn);
            prop_assert!(session.current_user(&ctx).is_err());
        }
    }

    /// Property: flipping any byte of a valid token makes it invalid
    #[test]
    fn proptest_tampered_token_is_not_signed_in(index in any::<prop::sample::Index>(), flip in 1u8..=255) {
        let strategies: [Arc<dyn CryptoStrategy>; 2] = [Arc::new(symmetric()), Arc::new(asymmetric())];
        for crypto in strategies {
            let session = session_over(Arc::clone(&crypto));
            let token = crypto.encrypt("alice;1700000000000").unwrap();

            let mut raw = base64_decode(&token);
            let i = index.index(raw.len());
            raw[i] ^= flip;
            let tampered = base64_encode(&raw);

            let mut ctx = with_token(&tampered);
            prop_assert_eq!(session.get_user(&mut ctx).unwrap_err(), SessionError::NotSignedIn);
        }
    }

    /// Property: tokens minted under another key never authenticate
    #[test]
    fn proptest_foreign_key_token_is_not_signed_in(seed in any::<[u8; 32]>()) {
        prop_assume!(seed != [42u8; 32] && seed != [7u8; 32]);
        let cases: [(Arc<dyn CryptoStrategy>, Arc<dyn CryptoStrategy>); 2] = [
            (
                Arc::new(symmetric()),
                Arc::new(SymmetricCrypto::new(&SecretKeyStore::new(seed, b"0123456789abcdef".to_vec()))),
            ),
            (
                Arc::new(asymmetric()),
                Arc::new(AsymmetricCrypto::new(KeyPairStore::from_private_seed(seed))),
            ),
        ];
        for (verifier, foreign) in cases {
            let session = session_over(verifier);
            let token = foreign.encrypt("alice;1700000000000").unwrap();
            let mut ctx = with_token(&token);
            prop_assert_eq!(session.get_user(&mut ctx).unwrap_err(), SessionError::NotSignedIn);
        }
    }

    /// Property: resolution is a stable sort of discovery order by `order`
    #[test]
    fn proptest_resolution_is_stable_by_order(
        type_orders in prop::collection::vec(-3i32..3, 0..4),
        method_orders in prop::collection::vec(-3i32..3, 0..4),
    ) {
        let (resolver, ty_markers, method_markers) = ordered_fixture(&type_orders, &method_orders);

        let mut ty = HandlerType::new("C");
        for marker in ty_markers {
            ty = ty.annotate_marker(marker);
        }
        let mut method = HandlerMethod::new(&Arc::new(ty), "m");
        for marker in method_markers {
            method = method.annotate_marker(marker);
        }

        let mut expected: Vec<(i32, usize)> = type_orders
            .iter()
            .chain(method_orders.iter())
            .copied()
            .zip(0..)
            .collect();
        expected.sort_by_key(|(order, _)| *order);
        let expected: Vec<usize> = expected.into_iter().map(|(_, slot)| slot).collect();

        let resolved = resolver.resolve(&method);
        let got: Vec<usize> = resolved.iter().map(|i| slot_of(i.name())).collect();
        prop_assert_eq!(&got, &expected);

        let again = resolver.resolve(&method);
        prop_assert!(Arc::ptr_eq(&resolved, &again));
    }
}

fn base64_decode(token: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .unwrap()
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Interceptor whose name is its slot number in discovery order.
struct Slot {
    name: &'static str,
    order: i32,
}

impl Interceptor for Slot {
    fn order(&self) -> i32 {
        self.order
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

const SLOT_NAMES: [&str; 8] = ["0", "1", "2", "3", "4", "5", "6", "7"];

fn slot_of(name: &str) -> usize {
    name.parse().unwrap()
}

/// Eight distinct marker types, one per slot.
#[derive(Clone, Copy)]
struct SlotMarker<const N: usize>;

enum AnyMarker {
    M0(SlotMarker<0>),
    M1(SlotMarker<1>),
    M2(SlotMarker<2>),
    M3(SlotMarker<3>),
    M4(SlotMarker<4>),
    M5(SlotMarker<5>),
    M6(SlotMarker<6>),
    M7(SlotMarker<7>),
}

trait Annotate: Sized {
    fn annotate_marker(self, marker: AnyMarker) -> Self;
}

impl Annotate for HandlerType {
    fn annotate_marker(self, marker: AnyMarker) -> Self {
        match marker {
            AnyMarker::M0(m) => self.annotate(m),
            AnyMarker::M1(m) => self.annotate(m),
            AnyMarker::M2(m) => self.annotate(m),
            AnyMarker::M3(m) => self.annotate(m),
            AnyMarker::M4(m) => self.annotate(m),
            AnyMarker::M5(m) => self.annotate(m),
            AnyMarker::M6(m) => self.annotate(m),
            AnyMarker::M7(m) => self.annotate(m),
        }
    }
}

impl Annotate for HandlerMethod {
    fn annotate_marker(self, marker: AnyMarker) -> Self {
        match marker {
            AnyMarker::M0(m) => self.annotate(m),
            AnyMarker::M1(m) => self.annotate(m),
            AnyMarker::M2(m) => self.annotate(m),
            AnyMarker::M3(m) => self.annotate(m),
            AnyMarker::M4(m) => self.annotate(m),
            AnyMarker::M5(m) => self.annotate(m),
            AnyMarker::M6(m) => self.annotate(m),
            AnyMarker::M7(m) => self.annotate(m),
        }
    }
}

fn marker(slot: usize) -> AnyMarker {
    match slot {
        0 => AnyMarker::M0(SlotMarker),
        1 => AnyMarker::M1(SlotMarker),
        2 => AnyMarker::M2(SlotMarker),
        3 => AnyMarker::M3(SlotMarker),
        4 => AnyMarker::M4(SlotMarker),
        5 => AnyMarker::M5(SlotMarker),
        6 => AnyMarker::M6(SlotMarker),
        _ => AnyMarker::M7(SlotMarker),
    }
}

/// Builds a resolver where slot `i` carries the `i`-th order, type-level
/// slots first.
fn ordered_fixture(
    type_orders: &[i32],
    method_orders: &[i32],
) -> (InterceptorResolver, Vec<AnyMarker>, Vec<AnyMarker>) {
    let orders: Vec<i32> = type_orders.iter().chain(method_orders).copied().collect();

    let mut container = StaticContainer::new();
    for (slot, order) in orders.iter().enumerate() {
        container = container.register(
            Some(SLOT_NAMES[slot]),
            Slot {
                name: SLOT_NAMES[slot],
                order: *order,
            },
        );
    }

    let registry = MarkerRegistry::new()
        .with::<SlotMarker<0>>(InterceptorBinding::from_container_id::<Slot>("0"))
        .with::<SlotMarker<1>>(InterceptorBinding::from_container_id::<Slot>("1"))
        .with::<SlotMarker<2>>(InterceptorBinding::from_container_id::<Slot>("2"))
        .with::<SlotMarker<3>>(InterceptorBinding::from_container_id::<Slot>("3"))
        .with::<SlotMarker<4>>(InterceptorBinding::from_container_id::<Slot>("4"))
        .with::<SlotMarker<5>>(InterceptorBinding::from_container_id::<Slot>("5"))
        .with::<SlotMarker<6>>(InterceptorBinding::from_container_id::<Slot>("6"))
        .with::<SlotMarker<7>>(InterceptorBinding::from_container_id::<Slot>("7"));

    let type_markers = (0..type_orders.len()).map(marker).collect();
    let method_markers = (type_orders.len()..orders.len()).map(marker).collect();
    (
        InterceptorResolver::new(registry).with_container(Arc::new(container)),
        type_markers,
        method_markers,
    )
}
