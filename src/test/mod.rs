//! Fixtures shared by the unit tests.
//!
//! [`factory`] registers a small pipeline vocabulary modelled on common visualization
//! objects. [`builtin_session`] wires a session to an [`InProcessServer`] for its data
//! server and hands the server back for inspection.

use std::sync::Arc;

use crate::{
    property::{Domain, PropertyDefinition, PropertyKind},
    proxy::{ProxyDefinition, ProxyFactory, SubProxyDefinition},
    server::InProcessServer,
    session::{Session, SessionConfig},
    stream::ServerRole,
};

/// Definitions used across the unit tests:
///
/// - `sources.SphereSource`: `Radius`, `Center`, `ThetaResolution`, `NumberOfPoints` (information)
/// - `filters.Shrink`: `Input` (single reference), `ShrinkFactor`
/// - `filters.Append`: repeatable `Input`
/// - `implicit_functions.Sphere`: `Radius`, `Center`
/// - `sources.Glyph`: `ScaleFactor` and sub-proxy `Shape` exposing `Radius`
/// - `misc.Holder`: no own properties, sub-proxy `Shape` exposing `Radius`
/// - `misc.Settings`: client-only proxy without a server class
pub fn factory() -> ProxyFactory {
    let factory = ProxyFactory::new();

    factory.register(
        ProxyDefinition::new("sources", "SphereSource", "vtkSphereSource")
            .update_command("Update")
            .property(
                PropertyDefinition::new("Radius", PropertyKind::Double)
                    .command("SetRadius")
                    .elements(1)
                    .default_value(0.5)
                    .domain(Domain::DoubleRange {
                        min: Some(0.0),
                        max: None,
                    }),
            )
            .property(
                PropertyDefinition::new("Center", PropertyKind::Double)
                    .command("SetCenter")
                    .elements(3)
                    .default_value([0.0, 0.0, 0.0]),
            )
            .property(
                PropertyDefinition::new("ThetaResolution", PropertyKind::Int)
                    .command("SetThetaResolution")
                    .elements(1)
                    .default_value(8)
                    .domain(Domain::int_range(3, 1024)),
            )
            .property(
                PropertyDefinition::new("NumberOfPoints", PropertyKind::Int)
                    .command("GetNumberOfPoints")
                    .information_only(),
            ),
    );

    factory.register(
        ProxyDefinition::new("filters", "Shrink", "vtkShrinkFilter")
            .update_command("Update")
            .property(
                PropertyDefinition::new("Input", PropertyKind::Proxy)
                    .command("SetInputConnection")
                    .domain(Domain::proxy_group(&["sources", "filters"])),
            )
            .property(
                PropertyDefinition::new("ShrinkFactor", PropertyKind::Double)
                    .command("SetShrinkFactor")
                    .elements(1)
                    .default_value(0.5)
                    .domain(Domain::double_range(0.0, 1.0)),
            ),
    );

    factory.register(
        ProxyDefinition::new("filters", "Append", "vtkAppendFilter")
            .update_command("Update")
            .property(
                PropertyDefinition::new("Input", PropertyKind::Proxy)
                    .command("AddInputConnection")
                    .clean_command("RemoveAllInputs")
                    .repeatable(1)
                    .domain(Domain::proxy_group(&["sources", "filters"])),
            ),
    );

    factory.register(
        ProxyDefinition::new("implicit_functions", "Sphere", "vtkSphere")
            .property(
                PropertyDefinition::new("Radius", PropertyKind::Double)
                    .command("SetRadius")
                    .elements(1)
                    .default_value(0.5),
            )
            .property(
                PropertyDefinition::new("Center", PropertyKind::Double)
                    .command("SetCenter")
                    .elements(3)
                    .default_value([0.0, 0.0, 0.0]),
            ),
    );

    factory.register(
        ProxyDefinition::new("sources", "Glyph", "vtkGlyph3D")
            .update_command("Update")
            .property(
                PropertyDefinition::new("ScaleFactor", PropertyKind::Double)
                    .command("SetScaleFactor")
                    .elements(1)
                    .default_value(1.0),
            )
            .sub_proxy(
                SubProxyDefinition::new("Shape", "implicit_functions", "Sphere").expose("Radius"),
            ),
    );

    factory.register(
        ProxyDefinition::new("misc", "Holder", "vtkHolder").sub_proxy(
            SubProxyDefinition::new("Shape", "implicit_functions", "Sphere").expose("Radius"),
        ),
    );

    factory.register(
        ProxyDefinition::new("misc", "Settings", "")
            .servers(ServerRole::CLIENT)
            .property(
                PropertyDefinition::new("Verbose", PropertyKind::Int)
                    .command("SetVerbose")
                    .elements(1)
                    .default_value(0)
                    .domain(Domain::Boolean),
            ),
    );

    factory
}

/// A session over [`factory`] whose data server is the returned [`InProcessServer`].
pub fn builtin_session() -> (Arc<Session>, InProcessServer) {
    session_with_config(SessionConfig::default())
}

/// Like [`builtin_session`], with an explicit configuration.
pub fn session_with_config(config: SessionConfig) -> (Arc<Session>, InProcessServer) {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = InProcessServer::new();
    let session = Session::builder(factory())
        .config(config)
        .data_server(server.clone())
        .build();
    (session, server)
}
