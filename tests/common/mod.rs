//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use smproxy::prelude::*;

/// Definitions of a small pipeline vocabulary.
pub const DEFINITIONS: &str = r#"
<ServerManagerConfiguration>
  <ProxyGroup name="sources">
    <SourceProxy name="SphereSource" class="vtkSphereSource" update_command="Update">
      <DoubleVectorProperty name="Radius" command="SetRadius"
                            number_of_elements="1" default_values="0.5">
        <DoubleRangeDomain name="range" min="0"/>
      </DoubleVectorProperty>
      <DoubleVectorProperty name="Center" command="SetCenter"
                            number_of_elements="3" default_values="0 0 0"/>
      <IntVectorProperty name="ThetaResolution" command="SetThetaResolution"
                         number_of_elements="1" default_values="8">
        <IntRangeDomain name="range" min="3" max="1024"/>
      </IntVectorProperty>
      <IntVectorProperty name="NumberOfPoints" command="GetNumberOfPoints"
                         information_only="1"/>
      <Hints>
        <ShowInMenu category="Sources"/>
      </Hints>
    </SourceProxy>

    <SourceProxy name="Glyph" class="vtkGlyph3D" update_command="Update">
      <DoubleVectorProperty name="ScaleFactor" command="SetScaleFactor"
                            number_of_elements="1" default_values="1"/>
      <SubProxy>
        <Proxy name="Shape" proxygroup="implicit_functions" proxyname="Sphere"/>
        <ExposedProperties>
          <Property name="Radius"/>
        </ExposedProperties>
      </SubProxy>
    </SourceProxy>
  </ProxyGroup>

  <ProxyGroup name="filters">
    <SourceProxy name="Shrink" class="vtkShrinkFilter" update_command="Update">
      <InputProperty name="Input" command="SetInputConnection">
        <ProxyGroupDomain name="groups">
          <Group name="sources"/>
          <Group name="filters"/>
        </ProxyGroupDomain>
      </InputProperty>
      <DoubleVectorProperty name="ShrinkFactor" command="SetShrinkFactor"
                            number_of_elements="1" default_values="0.5">
        <DoubleRangeDomain name="range" min="0" max="1"/>
      </DoubleVectorProperty>
    </SourceProxy>

    <SourceProxy name="Append" class="vtkAppendFilter" update_command="Update">
      <InputProperty name="Input" command="AddInputConnection"
                     clean_command="RemoveAllInputs" repeat_command="1">
        <ProxyGroupDomain name="groups">
          <Group name="sources"/>
          <Group name="filters"/>
        </ProxyGroupDomain>
      </InputProperty>
    </SourceProxy>
  </ProxyGroup>

  <ProxyGroup name="implicit_functions">
    <Proxy name="Sphere" class="vtkSphere">
      <DoubleVectorProperty name="Radius" command="SetRadius"
                            number_of_elements="1" default_values="0.5"/>
      <DoubleVectorProperty name="Center" command="SetCenter"
                            number_of_elements="3" default_values="0 0 0"/>
    </Proxy>
  </ProxyGroup>

  <ProxyGroup name="misc">
    <Proxy name="Holder" class="vtkHolder">
      <SubProxy>
        <Proxy name="Shape" proxygroup="implicit_functions" proxyname="Sphere"/>
        <ExposedProperties>
          <Property name="Radius"/>
        </ExposedProperties>
      </SubProxy>
    </Proxy>
  </ProxyGroup>
</ServerManagerConfiguration>
"#;

/// A factory loaded with [`DEFINITIONS`].
pub fn factory() -> ProxyFactory {
    let factory = ProxyFactory::new();
    factory
        .load_xml(DEFINITIONS)
        .expect("definitions are well-formed");
    factory
}

/// A session whose data server is an in-process interpreter, plus a handle to inspect it.
pub fn session() -> (Arc<Session>, InProcessServer) {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = InProcessServer::new();
    let session = Session::builder(factory())
        .data_server(server.clone())
        .build();
    (session, server)
}

/// Number of `method` calls executed on the first object of `proxy`.
pub fn invocations(server: &InProcessServer, proxy: &ProxyRc, method: &str) -> usize {
    let id = proxy.id(0).expect("proxy has server objects");
    server.with_interpreter(|interpreter| interpreter.invocation_count(id, method))
}
