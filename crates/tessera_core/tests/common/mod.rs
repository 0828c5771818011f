//! Marker components shared by the integration tests.

#![allow(dead_code)]

use tessera_core::define_component;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test1(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test2(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test3(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test4(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test5(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test6(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test7(pub u32);
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Test8(pub u32);

define_component!(Test1, 1);
define_component!(Test2, 2);
define_component!(Test3, 3);
define_component!(Test4, 4);
define_component!(Test5, 5);
define_component!(Test6, 6);
define_component!(Test7, 7);
define_component!(Test8, 8);
