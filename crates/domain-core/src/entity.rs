//! 实体与聚合根基础 trait
//!
//! 账户是本系统唯一的聚合根：刷新令牌、2FA 状态等都挂在
//! 账户之下，随账户一起落库与审计。

use emporia_common::AuditInfo;

/// 有稳定标识的领域对象（如账户）
pub trait Entity {
    type Id;

    fn id(&self) -> &Self::Id;
}

/// 聚合根：状态变更必须经过它，并带动审计时间戳
pub trait AggregateRoot: Entity {
    fn audit_info(&self) -> &AuditInfo;
    fn audit_info_mut(&mut self) -> &mut AuditInfo;

    /// 记录一次状态变更
    fn touch(&mut self) {
        self.audit_info_mut().touch();
    }
}
